use std::sync::Arc;

use futures::future::join_all;
use relay_core::telegram::{Message, OutgoingMessage};
use relay_core::{PriceSource, ProfileBackend, ProviderError, TelegramApi, backend_error_text};

use crate::command::{Command, is_valid_email, parse};

pub const PRICE_FAILURE: &str = "Failed to fetch price information.";
pub const MAX_PRICE_TICKERS: usize = 10;
pub const PRICE_USAGE: &str =
    "Usage: /price <TICKER> [<TICKER>...] (at most 10)\nExample: /price BTCUSDT";
pub const REGISTER_USAGE: &str = "Usage: /register <email>\nExample: /register you@example.com";
pub const HELP_TEXT: &str = "Available commands:\n\
/start - greeting\n\
/help - this list\n\
/price <TICKER> [<TICKER>...] - spot price from Bybit\n\
/chatid - show this chat's ID\n\
/register <email> - link your email to this chat\n\
/myinfo - show your registered profile\n\
/photo - send the configured photo";

/// Everything a handler may talk to.
#[derive(Clone)]
pub struct BotContext {
    pub telegram: Arc<dyn TelegramApi>,
    pub prices: Arc<dyn PriceSource>,
    pub backend: Option<Arc<dyn ProfileBackend>>,
    pub photo_file_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Photo(String),
}

/// Maps one inbound message to its reply; `None` when the bot stays silent.
pub async fn reply_for(ctx: &BotContext, message: &Message) -> Option<Reply> {
    if let Some(photo) = message.largest_photo() {
        return Some(Reply::Text(format!("Photo file_id: {}", photo.file_id)));
    }
    let command = parse(message.text.as_deref()?)?;
    let chat_id = message.chat.id;

    let text = match command {
        Command::Start => match &message.from {
            Some(user) => format!(
                "Hello, {}! Your user ID: {}. Send /help to see what I can do.",
                user.first_name, user.id
            ),
            None => "Hello! Send /help to see what I can do.".to_string(),
        },
        Command::Help => HELP_TEXT.to_string(),
        Command::ChatId => format!("Your chat ID: {chat_id}"),
        Command::HowAreYou => "OK".to_string(),
        Command::Price(tickers) => price_reply(ctx, &tickers).await,
        Command::Register(email) => register_reply(ctx, chat_id, email.as_deref()).await,
        Command::MyInfo => myinfo_reply(ctx, chat_id).await,
        Command::Photo => match &ctx.photo_file_id {
            Some(file_id) => return Some(Reply::Photo(file_id.clone())),
            None => "No photo is configured for this bot.".to_string(),
        },
        Command::Unknown(name) => {
            tracing::debug!(command = %name, "unknown command");
            "Unknown command. Use /help to see the list of commands.".to_string()
        }
    };
    Some(Reply::Text(text))
}

async fn price_reply(ctx: &BotContext, tickers: &[String]) -> String {
    if tickers.is_empty() || tickers.len() > MAX_PRICE_TICKERS {
        return PRICE_USAGE.to_string();
    }
    let lookups = tickers.iter().map(|ticker| {
        let prices = ctx.prices.clone();
        async move { (ticker, prices.spot_ticker(ticker).await) }
    });
    let single = tickers.len() == 1;
    join_all(lookups)
        .await
        .into_iter()
        .map(|(ticker, result)| match result {
            Ok(Some(quote)) => format!("Current price {ticker}: {}", quote.last_price),
            Ok(None) => {
                tracing::info!(%ticker, "no quote for ticker");
                failure_line(ticker, single)
            }
            Err(err) => {
                tracing::warn!(%ticker, error = %err, "ticker lookup failed");
                failure_line(ticker, single)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn failure_line(ticker: &str, single: bool) -> String {
    if single {
        PRICE_FAILURE.to_string()
    } else {
        format!("{ticker}: {PRICE_FAILURE}")
    }
}

async fn register_reply(ctx: &BotContext, chat_id: i64, email: Option<&str>) -> String {
    let Some(email) = email.filter(|e| is_valid_email(e)) else {
        return REGISTER_USAGE.to_string();
    };
    let Some(backend) = ctx.backend.as_ref() else {
        return "Registration is not available right now.".to_string();
    };
    match backend.register(chat_id, email).await {
        Ok(()) => {
            tracing::info!(chat_id, "user registered");
            format!("Registered {email}. Use /myinfo to see your profile.")
        }
        Err(err) => {
            tracing::warn!(chat_id, error = %err, "registration rejected");
            backend_error_text(&err)
        }
    }
}

async fn myinfo_reply(ctx: &BotContext, chat_id: i64) -> String {
    let Some(backend) = ctx.backend.as_ref() else {
        return "Profiles are not available right now.".to_string();
    };
    match backend.profile(chat_id).await {
        Ok(profile) => format!(
            "Your profile:\nChat ID: {}\nEmail: {}",
            profile.chat_id,
            profile.email.as_deref().unwrap_or("not set")
        ),
        Err(ProviderError::NotFound { .. }) => {
            "You are not registered yet. Use /register <email>.".to_string()
        }
        Err(err) => {
            tracing::warn!(chat_id, error = %err, "profile lookup failed");
            "Could not load your profile. Please try again later.".to_string()
        }
    }
}

/// Computes and sends the reply to `message`.
pub async fn handle_message(ctx: &BotContext, message: &Message) -> Result<(), ProviderError> {
    let chat_id = message.chat.id.to_string();
    match reply_for(ctx, message).await {
        Some(Reply::Text(text)) => {
            ctx.telegram
                .send_message(&OutgoingMessage::plain(&chat_id, text))
                .await
        }
        Some(Reply::Photo(file_id)) => ctx.telegram.send_photo(&chat_id, &file_id).await,
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::UserProfile;
    use relay_core::testkit::{MockBackend, MockPrices, MockTelegram};
    use serde_json::json;

    struct Fixture {
        telegram: Arc<MockTelegram>,
        prices: Arc<MockPrices>,
        backend: Arc<MockBackend>,
        ctx: BotContext,
    }

    fn fixture(prices: MockPrices, backend: MockBackend) -> Fixture {
        let telegram = Arc::new(MockTelegram::default());
        let prices = Arc::new(prices);
        let backend = Arc::new(backend);
        let ctx = BotContext {
            telegram: telegram.clone(),
            prices: prices.clone(),
            backend: Some(backend.clone()),
            photo_file_id: None,
        };
        Fixture {
            telegram,
            prices,
            backend,
            ctx,
        }
    }

    fn text_message(text: &str) -> Message {
        serde_json::from_value(json!({
            "message_id": 1,
            "chat": {"id": 555},
            "from": {"id": 42, "first_name": "Ada"},
            "text": text
        }))
        .unwrap()
    }

    async fn reply(f: &Fixture, text: &str) -> Option<Reply> {
        reply_for(&f.ctx, &text_message(text)).await
    }

    fn text(s: &str) -> Option<Reply> {
        Some(Reply::Text(s.to_string()))
    }

    #[tokio::test]
    async fn price_success_quotes_provider_string() {
        let f = fixture(
            MockPrices::default().with_quote("BTCUSDT", "64250.5"),
            MockBackend::default(),
        );
        assert_eq!(reply(&f, "/price btcusdt").await, text("Current price BTCUSDT: 64250.5"));
        assert_eq!(f.prices.calls(), vec!["BTCUSDT"]);
    }

    #[tokio::test]
    async fn price_failure_uses_fixed_message() {
        let f = fixture(MockPrices::default().failing("BTCUSDT"), MockBackend::default());
        assert_eq!(reply(&f, "/price BTCUSDT").await, text(PRICE_FAILURE));

        let f = fixture(MockPrices::default(), MockBackend::default());
        assert_eq!(reply(&f, "/price NOPE").await, text(PRICE_FAILURE));
    }

    #[tokio::test]
    async fn price_without_argument_makes_no_calls() {
        let f = fixture(MockPrices::default(), MockBackend::default());
        assert_eq!(reply(&f, "/price").await, text(PRICE_USAGE));
        assert!(f.prices.calls().is_empty());
    }

    #[tokio::test]
    async fn too_many_tickers_make_no_calls() {
        let f = fixture(MockPrices::default(), MockBackend::default());
        let tickers: Vec<String> = (0..=MAX_PRICE_TICKERS)
            .map(|i| format!("T{i}USDT"))
            .collect();
        let command = format!("/price {}", tickers.join(" "));
        assert_eq!(reply(&f, &command).await, text(PRICE_USAGE));
        assert!(f.prices.calls().is_empty());

        let at_cap = format!("/price {}", tickers[..MAX_PRICE_TICKERS].join(" "));
        reply(&f, &at_cap).await;
        assert_eq!(f.prices.calls().len(), MAX_PRICE_TICKERS);
    }

    #[tokio::test]
    async fn several_tickers_are_joined_in_order() {
        let f = fixture(
            MockPrices::default()
                .with_quote("BTCUSDT", "64250.5")
                .with_quote("ETHUSDT", "3400.1")
                .failing("XRPUSDT"),
            MockBackend::default(),
        );
        assert_eq!(
            reply(&f, "/price btcusdt xrpusdt ethusdt").await,
            text("Current price BTCUSDT: 64250.5\nXRPUSDT: Failed to fetch price information.\nCurrent price ETHUSDT: 3400.1")
        );
        assert_eq!(f.prices.calls().len(), 3);
    }

    #[tokio::test]
    async fn register_without_email_makes_no_calls() {
        let f = fixture(MockPrices::default(), MockBackend::default());
        assert_eq!(reply(&f, "/register").await, text(REGISTER_USAGE));
        assert_eq!(reply(&f, "/register not-an-email").await, text(REGISTER_USAGE));
        assert_eq!(f.backend.call_count(), 0);
    }

    #[tokio::test]
    async fn register_posts_chat_and_email() {
        let f = fixture(MockPrices::default(), MockBackend::default());
        assert_eq!(
            reply(&f, "/register ada@example.com").await,
            text("Registered ada@example.com. Use /myinfo to see your profile.")
        );
        assert_eq!(f.backend.registrations(), vec![(555, "ada@example.com".to_string())]);
    }

    #[tokio::test]
    async fn register_failure_shows_backend_text() {
        let backend = MockBackend::default().with_register_results(vec![Err(ProviderError::Client {
            status: relay_core::error::StatusCode::CONFLICT,
            body: r#"{"detail":"Email already registered"}"#.into(),
        })]);
        let f = fixture(MockPrices::default(), backend);
        assert_eq!(
            reply(&f, "/register ada@example.com").await,
            text("Email already registered")
        );
    }

    #[tokio::test]
    async fn myinfo_distinguishes_missing_profile() {
        let backend = MockBackend::default().with_profile(UserProfile {
            chat_id: 555,
            email: Some("ada@example.com".into()),
            extra: Default::default(),
        });
        let f = fixture(MockPrices::default(), backend);
        assert_eq!(
            reply(&f, "/myinfo").await,
            text("Your profile:\nChat ID: 555\nEmail: ada@example.com")
        );

        let f = fixture(MockPrices::default(), MockBackend::default());
        assert_eq!(
            reply(&f, "/myinfo").await,
            text("You are not registered yet. Use /register <email>.")
        );
    }

    #[tokio::test]
    async fn simple_commands_reply_directly() {
        let f = fixture(MockPrices::default(), MockBackend::default());
        assert_eq!(reply(&f, "/chatid").await, text("Your chat ID: 555"));
        assert_eq!(
            reply(&f, "/start").await,
            text("Hello, Ada! Your user ID: 42. Send /help to see what I can do.")
        );
        assert_eq!(reply(&f, "/help").await, text(HELP_TEXT));
        assert_eq!(reply(&f, "How are you?").await, text("OK"));
        assert_eq!(
            reply(&f, "/nope").await,
            text("Unknown command. Use /help to see the list of commands.")
        );
        assert_eq!(reply(&f, "just chatting").await, None);
    }

    #[tokio::test]
    async fn photo_messages_echo_largest_file_id() {
        let f = fixture(MockPrices::default(), MockBackend::default());
        let message: Message = serde_json::from_value(json!({
            "message_id": 2,
            "chat": {"id": 555},
            "photo": [
                {"file_id": "small", "width": 90, "height": 90},
                {"file_id": "big", "width": 800, "height": 800}
            ]
        }))
        .unwrap();
        assert_eq!(
            reply_for(&f.ctx, &message).await,
            text("Photo file_id: big")
        );
    }

    #[tokio::test]
    async fn photo_command_uses_configured_file() {
        let mut f = fixture(MockPrices::default(), MockBackend::default());
        assert_eq!(
            reply(&f, "/photo").await,
            text("No photo is configured for this bot.")
        );

        f.ctx.photo_file_id = Some("AgACAgIAAxk".into());
        handle_message(&f.ctx, &text_message("/photo")).await.unwrap();
        assert_eq!(
            f.telegram.photos(),
            vec![("555".to_string(), "AgACAgIAAxk".to_string())]
        );
        assert_eq!(f.telegram.send_count(), 0);
    }

    #[tokio::test]
    async fn handle_message_sends_plain_reply() {
        let f = fixture(MockPrices::default(), MockBackend::default());
        handle_message(&f.ctx, &text_message("/chatid")).await.unwrap();
        let sent = f.telegram.sent_messages();
        assert_eq!(sent, vec![OutgoingMessage::plain("555", "Your chat ID: 555")]);
    }
}
