/// What an inbound text message asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// Upper-cased ticker symbols; empty when none were given.
    Price(Vec<String>),
    ChatId,
    Register(Option<String>),
    MyInfo,
    Photo,
    HowAreYou,
    Unknown(String),
}

const HOW_ARE_YOU: [&str; 2] = ["how are you?", "как дела?"];

/// Parses message text. Returns `None` for free text the bot does not react to.
pub fn parse(text: &str) -> Option<Command> {
    let text = text.trim();
    if HOW_ARE_YOU.iter().any(|t| text.to_lowercase() == *t) {
        return Some(Command::HowAreYou);
    }
    let rest = text.strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let head = parts.next().unwrap_or_default();
    let name = head.split('@').next().unwrap_or_default().to_lowercase();
    let args: Vec<&str> = parts.collect();

    Some(match name.as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "price" => Command::Price(args.iter().map(|s| s.to_uppercase()).collect()),
        "chatid" => Command::ChatId,
        "register" => Command::Register(args.first().map(|s| s.to_string())),
        "myinfo" => Command::MyInfo,
        "photo" => Command::Photo,
        _ => Command::Unknown(head.to_string()),
    })
}

/// Loose shape check: one `@`, non-empty local part, dotted domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .collect::<Vec<_>>()
            .windows(2)
            .all(|pair| !pair[0].is_empty() && !pair[1].is_empty())
        && domain.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_bot_suffix_and_case() {
        assert_eq!(parse("/start"), Some(Command::Start));
        assert_eq!(parse("/HELP@relay_bot"), Some(Command::Help));
        assert_eq!(parse("  /chatid  "), Some(Command::ChatId));
        assert_eq!(parse("/myinfo"), Some(Command::MyInfo));
        assert_eq!(parse("/photo"), Some(Command::Photo));
    }

    #[test]
    fn price_upper_cases_every_ticker() {
        assert_eq!(
            parse("/price btcusdt ethUSDT"),
            Some(Command::Price(vec!["BTCUSDT".into(), "ETHUSDT".into()]))
        );
        assert_eq!(parse("/price"), Some(Command::Price(vec![])));
    }

    #[test]
    fn register_takes_first_argument() {
        assert_eq!(
            parse("/register a@b.co extra"),
            Some(Command::Register(Some("a@b.co".into())))
        );
        assert_eq!(parse("/register"), Some(Command::Register(None)));
    }

    #[test]
    fn free_text_triggers_and_ignores() {
        assert_eq!(parse("How are you?"), Some(Command::HowAreYou));
        assert_eq!(parse("Как дела?"), Some(Command::HowAreYou));
        assert_eq!(parse("hello there"), None);
        assert_eq!(parse("/frobnicate now"), Some(Command::Unknown("frobnicate".into())));
    }

    #[test]
    fn validates_email_shape() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@mail.example.org"));
        assert!(!is_valid_email("user"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("user@example."));
        assert!(!is_valid_email("a@b@c.com"));
    }
}
