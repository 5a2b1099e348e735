//! Bot initialization and the command list

use reqwest::ClientBuilder;
use secrecy::{ExposeSecret, SecretString};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use climecore::core::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "show this help")]
    Start,
    #[command(description = "list records in stock")]
    Inventory,
    #[command(description = "add a record from Discogs")]
    Add,
    #[command(description = "start a sale")]
    Sell,
    #[command(description = "today's sales report")]
    Report,
    #[command(description = "inventory and sales totals")]
    Stats,
    #[command(description = "records that are running out")]
    Lowstock,
    #[command(description = "stop adding or selling")]
    Cancel,
}

/// Creates a Bot instance, honouring BOT_API_URL when a local Bot API server is used
pub fn create_bot(token: &SecretString) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::catalog::timeout()).build()?;
    let bot = Bot::with_client(token.expose_secret(), client);

    let bot = match std::env::var("BOT_API_URL") {
        Ok(api_url) => {
            log::info!("Using custom Bot API URL: {}", api_url);
            let url = reqwest::Url::parse(&api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            bot.set_api_url(url)
        }
        Err(_) => bot,
    };

    Ok(bot)
}

/// Publishes the command list in the Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_command_descriptions() {
        let text = Command::descriptions().to_string();
        assert!(text.contains("Available commands"));
        assert!(text.contains("/sell"));
        assert!(text.contains("/lowstock"));
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/sell", "climebot").unwrap(), Command::Sell);
        assert_eq!(Command::parse("/lowstock", "climebot").unwrap(), Command::Lowstock);
        assert!(Command::parse("/refund", "climebot").is_err());
    }
}
