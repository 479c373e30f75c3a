use std::time::Duration;

use relay_core::ProviderError;
use relay_telemetry::{TelemetryLabels, record_counter, with_common_fields};
use tokio::time::sleep;
use tracing::Instrument;

use crate::handlers::{BotContext, handle_message};

const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Fetches one `getUpdates` batch, handles it in order and returns the next offset.
pub async fn poll_once(
    ctx: &BotContext,
    offset: Option<i64>,
    timeout: Duration,
) -> Result<Option<i64>, ProviderError> {
    let updates = ctx.telegram.get_updates(offset, timeout).await?;
    let mut next = offset;
    for update in updates {
        next = Some(update.update_id + 1);
        let Some(message) = update.message else {
            continue;
        };
        let span = tracing::info_span!(
            "bot.update",
            update_id = update.update_id,
            service = tracing::field::Empty,
            chat_id = tracing::field::Empty,
            event_id = tracing::field::Empty,
        );
        let chat_id = message.chat.id.to_string();
        let event_id = message.message_id.to_string();
        with_common_fields(&span, "relay-bot", Some(&chat_id), Some(&event_id));

        let outcome = match handle_message(ctx, &message).instrument(span.clone()).await {
            Ok(()) => "handled",
            Err(err) => {
                span.in_scope(|| tracing::warn!(error = %err, "failed to send reply"));
                "reply_failed"
            }
        };
        record_counter(
            "relay_bot_updates_total",
            1,
            &TelemetryLabels::new("relay-bot").with_outcome(outcome),
        );
    }
    Ok(next)
}

/// Long-polls forever; transport failures back off and retry with the same offset.
pub async fn run(ctx: BotContext, timeout: Duration) {
    let mut offset = None;
    loop {
        match poll_once(&ctx, offset, timeout).await {
            Ok(next) => offset = next,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    backoff_secs = ERROR_BACKOFF.as_secs(),
                    "getUpdates failed"
                );
                sleep(ERROR_BACKOFF).await;
            }
        }
    }
}
