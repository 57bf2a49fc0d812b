use tracing::info;

use super::{ActionDispatcher, DispatchContext, DispatchOutcome};
use crate::error::Result;
use crate::profile::ProfileUpdate;

impl ActionDispatcher {
    /// Merge an update into the profile and say which fields changed.
    pub(super) async fn update_profile(
        &self,
        ctx: &DispatchContext<'_>,
        update: &ProfileUpdate,
        correction: bool,
    ) -> Result<DispatchOutcome> {
        if update.is_empty() {
            return Ok(DispatchOutcome::reply(
                "What would you like to update in your business profile? For example your hours, services, location, or contact details.",
            ));
        }

        let mut merged = ctx.profile.clone();
        let changed = merged.apply(update);
        if changed.is_empty() {
            return Ok(DispatchOutcome::reply(
                "Your profile already has those details, so nothing needed changing.",
            ));
        }

        self.profiles.update_profile(ctx.user_id, update).await?;
        info!(
            user_id = ctx.user_id,
            fields = ?changed,
            correction,
            "Profile updated"
        );

        let fields = join_fields(&changed);
        let reply = if correction {
            format!("Thanks for the correction! I've fixed your {fields}.")
        } else {
            format!("Got it! I've updated your {fields}.")
        };
        Ok(DispatchOutcome::reply(reply))
    }
}

fn join_fields(fields: &[&str]) -> String {
    match fields {
        [] => String::new(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}
