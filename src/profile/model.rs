//! Business profile data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tone the generated content should take.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrandVoice {
    #[default]
    Friendly,
    Professional,
    Witty,
    Formal,
}

impl BrandVoice {
    /// Lenient parse used at the classifier and scraper boundaries.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "friendly" | "casual" | "warm" => Some(Self::Friendly),
            "professional" => Some(Self::Professional),
            "witty" | "playful" | "funny" => Some(Self::Witty),
            "formal" => Some(Self::Formal),
            _ => None,
        }
    }
}

impl std::fmt::Display for BrandVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Friendly => write!(f, "friendly"),
            Self::Professional => write!(f, "professional"),
            Self::Witty => write!(f, "witty"),
            Self::Formal => write!(f, "formal"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Location {
    /// "City, State" style one-liner, or `None` when nothing is known.
    pub fn summary(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.city, &self.state, &self.country]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            self.address.clone()
        } else {
            Some(parts.join(", "))
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// A service or product the business offers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

/// Free-form label/value pair the user asked us to remember.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomAttribute {
    pub label: String,
    pub value: String,
}

/// One per user. Absence routes every message through onboarding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusinessProfile {
    pub business_name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_hours: Option<String>,
    #[serde(default)]
    pub brand_voice: BrandVoice,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub custom_attributes: Vec<CustomAttribute>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BusinessProfile {
    /// A fresh profile with only a name.
    pub fn new(business_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            business_name: business_name.into(),
            industry: String::new(),
            location: Location::default(),
            contact: ContactInfo::default(),
            services: Vec::new(),
            business_hours: None,
            brand_voice: BrandVoice::default(),
            target_audience: None,
            custom_attributes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a profile from a partial update. `None` if no business name is known.
    pub fn from_update(update: &ProfileUpdate) -> Option<Self> {
        let name = update.business_name.as_deref()?.trim();
        if name.is_empty() {
            return None;
        }
        let mut profile = Self::new(name);
        profile.apply(update);
        Some(profile)
    }

    /// Merge a partial update. Returns the labels of fields that changed.
    pub fn apply(&mut self, update: &ProfileUpdate) -> Vec<&'static str> {
        let mut changed = Vec::new();

        if let Some(name) = non_empty(&update.business_name)
            && self.business_name != name
        {
            self.business_name = name.to_string();
            changed.push("business name");
        }
        if let Some(industry) = non_empty(&update.industry)
            && self.industry != industry
        {
            self.industry = industry.to_string();
            changed.push("industry");
        }
        if let Some(ref location) = update.location {
            let merged = Location {
                address: location.address.clone().or(self.location.address.clone()),
                city: location.city.clone().or(self.location.city.clone()),
                state: location.state.clone().or(self.location.state.clone()),
                zip: location.zip.clone().or(self.location.zip.clone()),
                country: location.country.clone().or(self.location.country.clone()),
            };
            if merged != self.location {
                self.location = merged;
                changed.push("location");
            }
        }
        if let Some(ref contact) = update.contact {
            let merged = ContactInfo {
                phone: contact.phone.clone().or(self.contact.phone.clone()),
                email: contact.email.clone().or(self.contact.email.clone()),
                website: contact.website.clone().or(self.contact.website.clone()),
            };
            if merged != self.contact {
                self.contact = merged;
                changed.push("contact info");
            }
        }
        if !update.services.is_empty() {
            for service in &update.services {
                match self
                    .services
                    .iter_mut()
                    .find(|s| s.name.eq_ignore_ascii_case(&service.name))
                {
                    Some(existing) => *existing = service.clone(),
                    None => self.services.push(service.clone()),
                }
            }
            changed.push("services");
        }
        if let Some(hours) = non_empty(&update.business_hours) {
            self.business_hours = Some(hours.to_string());
            changed.push("business hours");
        }
        if let Some(voice) = update.brand_voice
            && voice != self.brand_voice
        {
            self.brand_voice = voice;
            changed.push("brand voice");
        }
        if let Some(audience) = non_empty(&update.target_audience) {
            self.target_audience = Some(audience.to_string());
            changed.push("target audience");
        }
        if !update.custom_attributes.is_empty() {
            for attr in &update.custom_attributes {
                match self
                    .custom_attributes
                    .iter_mut()
                    .find(|a| a.label.eq_ignore_ascii_case(&attr.label))
                {
                    Some(existing) => existing.value = attr.value.clone(),
                    None => self.custom_attributes.push(attr.clone()),
                }
            }
            changed.push("custom details");
        }

        if !changed.is_empty() {
            self.updated_at = Utc::now();
        }
        changed
    }

    /// Render the profile as a compact block for classifier prompts.
    pub fn to_prompt_section(&self) -> String {
        let mut parts = vec!["# Business Profile".to_string()];
        parts.push(format!("- **Name:** {}", self.business_name));
        if !self.industry.is_empty() {
            parts.push(format!("- **Industry:** {}", self.industry));
        }
        if let Some(location) = self.location.summary() {
            parts.push(format!("- **Location:** {}", location));
        }
        if let Some(ref website) = self.contact.website {
            parts.push(format!("- **Website:** {}", website));
        }
        if !self.services.is_empty() {
            let names: Vec<&str> = self.services.iter().map(|s| s.name.as_str()).collect();
            parts.push(format!("- **Services:** {}", names.join(", ")));
        }
        parts.push(format!("- **Brand voice:** {}", self.brand_voice));
        if let Some(ref audience) = self.target_audience {
            parts.push(format!("- **Audience:** {}", audience));
        }
        parts.join("\n")
    }
}

/// Partial profile as produced by classification or extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_voice: Option<BrandVoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_attributes: Vec<CustomAttribute>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
