//! Manual balance check command.
//!
//! The weekly check normally starts itself from the scheduler; this command
//! lets a user kick one off whenever they want. Answers go through the
//! message pipeline from there, in whatever channel the user replies in.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::reconcile,
        errors::{Error, Result},
    };

    /// Starts a balance check right now, outside the weekly schedule.
    ///
    /// Restarts from the first wallet if a check was already in progress.
    #[poise::command(slash_command, prefix_command)]
    pub async fn check_balance_manual(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;
        let user_id = ctx.author().id.to_string();

        let first = reconcile::start_check(db, &user_id).await?;
        ctx.say(reconcile::prompt_start(first)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
