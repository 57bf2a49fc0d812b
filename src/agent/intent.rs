//! Intent model: the closed set of things a turn can ask for, and the
//! typed entities each one carries.
//!
//! Raw classifier output is loosely typed JSON. It is validated into
//! [`IntentResult`] here, at the boundary, so dispatch code never digs
//! through an untyped entity bag.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::profile::{
    BrandVoice, ContactInfo, CustomAttribute, Location, ProfileUpdate, Service,
};
use crate::services::PageType;

/// Closed intent tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentKind {
    UpdateProfile,
    UserCorrection,
    CreateWebsite,
    WriteBlog,
    GetSuggestions,
    CreatePage,
    DeletePage,
    RenamePage,
    UpdatePageContent,
    GenerateLegalPages,
    GetAnalytics,
    AddEmbed,
    BillingQuestion,
    Unknown,
}

impl IntentKind {
    pub const ALL: [IntentKind; 14] = [
        Self::UpdateProfile,
        Self::UserCorrection,
        Self::CreateWebsite,
        Self::WriteBlog,
        Self::GetSuggestions,
        Self::CreatePage,
        Self::DeletePage,
        Self::RenamePage,
        Self::UpdatePageContent,
        Self::GenerateLegalPages,
        Self::GetAnalytics,
        Self::AddEmbed,
        Self::BillingQuestion,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpdateProfile => "UPDATE_PROFILE",
            Self::UserCorrection => "USER_CORRECTION",
            Self::CreateWebsite => "CREATE_WEBSITE",
            Self::WriteBlog => "WRITE_BLOG",
            Self::GetSuggestions => "GET_SUGGESTIONS",
            Self::CreatePage => "CREATE_PAGE",
            Self::DeletePage => "DELETE_PAGE",
            Self::RenamePage => "RENAME_PAGE",
            Self::UpdatePageContent => "UPDATE_PAGE_CONTENT",
            Self::GenerateLegalPages => "GENERATE_LEGAL_PAGES",
            Self::GetAnalytics => "GET_ANALYTICS",
            Self::AddEmbed => "ADD_EMBED",
            Self::BillingQuestion => "BILLING_QUESTION",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Accepts `CREATE_PAGE`, `create_page`, and `create-page`.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        Self::ALL.into_iter().find(|k| k.as_str() == normalized)
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatePageEntities {
    pub title: Option<String>,
    pub page_type: Option<PageType>,
    pub keyword: Option<String>,
    /// Clarifying detail (questions, focus points, reviews).
    pub details: Option<String>,
}

/// An intent with exactly the entities it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    UpdateProfile(ProfileUpdate),
    UserCorrection(ProfileUpdate),
    CreateWebsite,
    WriteBlog { topic: Option<String> },
    GetSuggestions,
    CreatePage(CreatePageEntities),
    DeletePage { page: Option<String>, confirmed: bool },
    RenamePage { page: Option<String>, new_title: Option<String> },
    UpdatePageContent { page: Option<String>, instructions: Option<String> },
    GenerateLegalPages,
    GetAnalytics,
    AddEmbed { page: Option<String>, html: Option<String> },
    BillingQuestion,
    Unknown,
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Self::UpdateProfile(_) => IntentKind::UpdateProfile,
            Self::UserCorrection(_) => IntentKind::UserCorrection,
            Self::CreateWebsite => IntentKind::CreateWebsite,
            Self::WriteBlog { .. } => IntentKind::WriteBlog,
            Self::GetSuggestions => IntentKind::GetSuggestions,
            Self::CreatePage(_) => IntentKind::CreatePage,
            Self::DeletePage { .. } => IntentKind::DeletePage,
            Self::RenamePage { .. } => IntentKind::RenamePage,
            Self::UpdatePageContent { .. } => IntentKind::UpdatePageContent,
            Self::GenerateLegalPages => IntentKind::GenerateLegalPages,
            Self::GetAnalytics => IntentKind::GetAnalytics,
            Self::AddEmbed { .. } => IntentKind::AddEmbed,
            Self::BillingQuestion => IntentKind::BillingQuestion,
            Self::Unknown => IntentKind::Unknown,
        }
    }

    /// Validate a loose entity map into the variant for `kind`.
    pub fn from_entities(kind: IntentKind, entities: &Map<String, Value>) -> Self {
        let page = || {
            str_field(
                entities,
                &["page", "pageSlug", "page_slug", "slug", "pageTitle", "page_title", "pageName"],
            )
        };
        match kind {
            IntentKind::UpdateProfile => Self::UpdateProfile(profile_update(entities)),
            IntentKind::UserCorrection => Self::UserCorrection(profile_update(entities)),
            IntentKind::CreateWebsite => Self::CreateWebsite,
            IntentKind::WriteBlog => Self::WriteBlog {
                topic: str_field(entities, &["topic", "title", "subject"]),
            },
            IntentKind::GetSuggestions => Self::GetSuggestions,
            IntentKind::CreatePage => Self::CreatePage(CreatePageEntities {
                title: str_field(entities, &["title", "pageTitle", "page_title", "name"]),
                page_type: str_field(entities, &["pageType", "page_type", "type"])
                    .and_then(|t| PageType::parse(&t)),
                keyword: str_field(entities, &["keyword", "targetKeyword"]),
                details: str_field(entities, &["details", "detail", "content", "questions"]),
            }),
            IntentKind::DeletePage => Self::DeletePage {
                page: page(),
                confirmed: bool_field(entities, &["confirmed", "confirm", "confirmation"]),
            },
            IntentKind::RenamePage => Self::RenamePage {
                page: str_field(
                    entities,
                    &["page", "oldTitle", "old_title", "currentTitle", "slug", "pageSlug"],
                ),
                new_title: str_field(entities, &["newTitle", "new_title", "newName", "title"]),
            },
            IntentKind::UpdatePageContent => Self::UpdatePageContent {
                page: page(),
                instructions: str_field(
                    entities,
                    &["instructions", "content", "changes", "update", "text"],
                ),
            },
            IntentKind::GenerateLegalPages => Self::GenerateLegalPages,
            IntentKind::GetAnalytics => Self::GetAnalytics,
            IntentKind::AddEmbed => Self::AddEmbed {
                page: page(),
                html: str_field(entities, &["html", "embedCode", "embed_code", "code"]),
            },
            IntentKind::BillingQuestion => Self::BillingQuestion,
            IntentKind::Unknown => Self::Unknown,
        }
    }
}

/// Structured classifier output for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentResult {
    pub intent: Intent,
    pub needs_clarification: bool,
    pub clarification: Option<String>,
    /// In `[0, 1]`.
    pub confidence: f32,
}

/// Question asked whenever classification produced nothing usable.
pub const FALLBACK_CLARIFICATION: &str = "I'm not sure I understood that. Could you tell me a bit more about what you'd like to do? For example, I can update your business info, create or edit pages, add embeds, or show your analytics.";

impl IntentResult {
    /// The mandatory result for any classifier failure.
    pub fn fallback() -> Self {
        Self {
            intent: Intent::Unknown,
            needs_clarification: true,
            clarification: Some(FALLBACK_CLARIFICATION.to_string()),
            confidence: 0.0,
        }
    }

    pub fn kind(&self) -> IntentKind {
        self.intent.kind()
    }
}

// ── Raw output parsing ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawIntent {
    intent: String,
    #[serde(default)]
    entities: Option<Value>,
    #[serde(default, alias = "needsClarification")]
    needs_clarification: Option<Value>,
    #[serde(default, alias = "clarificationQuestion", alias = "clarification")]
    clarification_question: Option<String>,
    confidence: Value,
}

/// Parse a classifier response into an [`IntentResult`].
///
/// Errors on non-JSON, a missing `intent` or `confidence`, or an intent
/// outside the closed set. Callers turn errors into [`IntentResult::fallback`].
pub fn parse_classifier_output(raw: &str) -> Result<IntentResult, String> {
    if raw.trim().is_empty() {
        return Err("empty response".into());
    }
    let json_str = extract_json_object(raw);
    let parsed: RawIntent =
        serde_json::from_str(&json_str).map_err(|e| format!("JSON parse error: {e}"))?;

    let kind = IntentKind::parse(&parsed.intent)
        .ok_or_else(|| format!("unknown intent tag: {}", parsed.intent))?;
    let confidence = coerce_f32(&parsed.confidence)
        .ok_or_else(|| format!("invalid confidence: {}", parsed.confidence))?
        .clamp(0.0, 1.0);

    let entities = match parsed.entities {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let clarification = parsed
        .clarification_question
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());
    let needs_clarification = parsed
        .needs_clarification
        .as_ref()
        .and_then(coerce_bool)
        .unwrap_or(false);

    Ok(IntentResult {
        intent: Intent::from_entities(kind, &entities),
        needs_clarification,
        clarification,
        confidence,
    })
}

/// Pull the JSON object out of a response that may be wrapped in prose or
/// a markdown fence.
pub(crate) fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

// ── Loose value coercion ────────────────────────────────────────────

/// Numbers above 1 and `"85%"` strings are read as percentages.
fn coerce_f32(value: &Value) -> Option<f32> {
    let (raw, percent) = match value {
        Value::Number(n) => (n.as_f64()? as f32, false),
        Value::String(s) => {
            let s = s.trim();
            (
                s.trim_end_matches('%').trim().parse::<f32>().ok()?,
                s.ends_with('%'),
            )
        }
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(if percent || raw > 1.0 { raw / 100.0 } else { raw })
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "confirmed" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn str_field(entities: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| entities.get(*k))
        .find_map(coerce_string)
}

fn bool_field(entities: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter()
        .filter_map(|k| entities.get(*k))
        .find_map(coerce_bool)
        .unwrap_or(false)
}

pub(crate) fn profile_update(entities: &Map<String, Value>) -> ProfileUpdate {
    let nested = |key: &str| entities.get(key).and_then(Value::as_object);

    let location_src = nested("location").unwrap_or(entities);
    let location = Location {
        address: str_field(location_src, &["address", "street"]),
        city: str_field(location_src, &["city"]),
        state: str_field(location_src, &["state", "region"]),
        zip: str_field(location_src, &["zip", "zipCode", "postalCode", "postal_code"]),
        country: str_field(location_src, &["country"]),
    };
    let contact_src = nested("contact").unwrap_or(entities);
    let contact = ContactInfo {
        phone: str_field(contact_src, &["phone", "phoneNumber"]),
        email: str_field(contact_src, &["email"]),
        website: str_field(contact_src, &["website", "url"]),
    };

    let services = entities
        .get("services")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(name) if !name.trim().is_empty() => Some(Service {
                        name: name.trim().to_string(),
                        description: String::new(),
                        price: None,
                    }),
                    Value::Object(obj) => Some(Service {
                        name: str_field(obj, &["name"])?,
                        description: str_field(obj, &["description"]).unwrap_or_default(),
                        price: str_field(obj, &["price"]),
                    }),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let mut custom_attributes: Vec<CustomAttribute> = entities
        .get("customAttributes")
        .or_else(|| entities.get("custom_attributes"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|obj| {
                    Some(CustomAttribute {
                        label: str_field(obj, &["label", "name"])?,
                        value: str_field(obj, &["value"])?,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    // Single "field"/"value" pairs that don't map onto a known field.
    if let (Some(label), Some(value)) = (
        str_field(entities, &["field", "label"]),
        str_field(entities, &["value"]),
    ) {
        custom_attributes.push(CustomAttribute { label, value });
    }

    ProfileUpdate {
        business_name: str_field(entities, &["businessName", "business_name", "name"]),
        industry: str_field(entities, &["industry", "category"]),
        location: (location != Location::default()).then_some(location),
        contact: (contact != ContactInfo::default()).then_some(contact),
        services,
        business_hours: str_field(entities, &["businessHours", "business_hours", "hours"]),
        brand_voice: str_field(entities, &["brandVoice", "brand_voice", "voice", "tone"])
            .and_then(|v| BrandVoice::parse(&v)),
        target_audience: str_field(entities, &["targetAudience", "target_audience", "audience"]),
        custom_attributes,
    }
}
