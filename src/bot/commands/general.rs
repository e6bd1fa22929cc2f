//! General Discord commands - ping, help, and other utility commands.
//! This module contains simple commands that don't require database operations
//! and provide basic bot functionality and user assistance.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with a short greeting to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("ぽん！🏓").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    ///
    /// Covers both the slash commands and the chat phrases the bot
    /// understands in its watched channels.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**そらちゃんの使い方**\n\n\
        **おさいふコマンド**\n\
        • `/balance` - 4つの財布の残高を見る\n\
        • `/salary <金額>` - お給料を財布に振り分ける\n\
        • `/spend <金額> <カテゴリ>` - 出費を記録する（財布・日付・帳簿のみも指定できるよ）\n\
        • `/transfer <金額> <から> <へ>` - 財布間でお金を移す\n\
        • `/reset <金額> <財布>` - 財布の残高を上書きする\n\
        • `/history` - 最近の記録を見る\n\
        • `/edit_spend <ID>` - 過去の出費を直す\n\
        • `/report` - 今週・今月の出費レポート\n\
        • `/check_balance_manual` - 残高チェックをすぐ始める\n\n\
        **アクティビティ**\n\
        • `HH:MM ○○わず` / `○○なう` / `HH:MM ○○うぃる` と書くと記録するよ\n\
        • ぼくにメンションすると今日のまとめを出すよ\n\
        • `/scan_past_activities` - 過去のメッセージをさかのぼって記録\n\n\
        **おかね（チャット）**\n\
        • 「食費に500円」みたいに書くと出費を記録するよ\n\n\
        **収納**\n\
        • 「収納追加」「○○をしまう」「○○はどこ？」「○○になにがある？」\n\n\
        毎週の残高チェックもよろしくね！";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
