//! Onboarding replies and the profile extraction prompt.

use crate::profile::BusinessProfile;

pub const ASK_FOR_WEBSITE: &str = "Hi! I'm here to help your business grow online. Do you already have a website I can learn about your business from? Just paste the link. If not, tell me your business name and what you do.";

pub const MANUAL_SETUP: &str = "I couldn't pull your details automatically, so let's set things up by hand. What's the name of your business, and what do you do?";

/// Confirmation after a profile was bootstrapped.
pub fn profile_created(profile: &BusinessProfile, from_website: bool) -> String {
    let mut found = profile.business_name.clone();
    if !profile.industry.is_empty() {
        found.push_str(&format!(" ({})", profile.industry));
    }
    if let Some(location) = profile.location.summary() {
        found.push_str(&format!(" in {location}"));
    }
    let source = if from_website {
        "from your website"
    } else {
        "from what you told me"
    };
    format!(
        "Great, I found {found}! I've set up your business profile {source}. If anything looks off, just tell me and I'll correct it."
    )
}

/// System prompt for turning page text or a description into profile JSON.
pub fn extraction_system_prompt() -> String {
    "You extract a small business's details from text. The text is either the content of the business's website or the owner's own description.\n\n\
     Respond with ONLY a JSON object. Omit any field the text does not state:\n\
     {\"businessName\": \"...\", \"industry\": \"...\", \"location\": {\"address\": \"...\", \"city\": \"...\", \"state\": \"...\", \"zip\": \"...\", \"country\": \"...\"}, \"phone\": \"...\", \"email\": \"...\", \"website\": \"...\", \"services\": [{\"name\": \"...\", \"description\": \"...\", \"price\": \"...\"}], \"hours\": \"...\", \"brandVoice\": \"friendly|professional|witty|formal\", \"targetAudience\": \"...\"}\n\n\
     Rules:\n\
     - Never invent details\n\
     - If no business name is stated, return {}"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Location;

    #[test]
    fn confirmation_names_the_business() {
        let mut profile = BusinessProfile::new("Rosa's Bakery");
        profile.industry = "Bakery".into();
        profile.location = Location {
            city: Some("Austin".into()),
            state: Some("TX".into()),
            ..Location::default()
        };
        let text = profile_created(&profile, true);
        assert!(text.contains("Rosa's Bakery (Bakery) in Austin, TX"));
        assert!(text.contains("from your website"));
    }
}
