//! Background poller — delivers due scheduled messages and advances the
//! daily chain.

use super::{proactive, recommend};
use solace_core::{
    error::SolaceError,
    recommend::recommendation_due,
    schedule,
    traits::{Generator, Mailer},
    types::{MessageType, ScheduleStatus, TurnRole},
};
use solace_memory::{ScheduledMessage, Store};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Statuses that block scheduling a chained successor. A skipped stage
/// does not: the chain may legitimately be re-entered the next day.
const CHAIN_GUARD: [ScheduleStatus; 3] = [
    ScheduleStatus::Pending,
    ScheduleStatus::Processing,
    ScheduleStatus::Sent,
];

/// Poll for due rows and process them one at a time. Serial processing
/// keeps per-user ordering simple; throughput is not a concern at this
/// cadence.
pub(crate) async fn scheduler_loop(
    store: Store,
    generator: Arc<dyn Generator>,
    mailer: Arc<dyn Mailer>,
    poll_secs: u64,
) {
    loop {
        tokio::time::sleep(std::time::Duration::from_secs(poll_secs)).await;

        match store.list_due_scheduled().await {
            Ok(rows) => {
                for row in &rows {
                    if let Err(e) =
                        process_due_message(&store, generator.as_ref(), mailer.as_ref(), row).await
                    {
                        error!("scheduler: processing {} failed: {e}", row.id);
                    }
                }
            }
            Err(e) => {
                error!("scheduler: failed to list due messages: {e}");
            }
        }
    }
}

/// Process one due row end to end.
///
/// Claims the row first; a failed claim means another tick owns it.
/// Transient failures release the claim so the next tick retries.
pub(crate) async fn process_due_message(
    store: &Store,
    generator: &dyn Generator,
    mailer: &dyn Mailer,
    row: &ScheduledMessage,
) -> Result<(), SolaceError> {
    let Some(message_type) = row.kind() else {
        warn!("scheduler: unknown message type '{}' on {}", row.message_type, row.id);
        store.mark_scheduled(&row.id, ScheduleStatus::Skipped).await?;
        return Ok(());
    };

    if !store.claim_scheduled(&row.id).await? {
        return Ok(());
    }

    match deliver(store, generator, mailer, row, message_type).await {
        Ok(()) => Ok(()),
        Err(e) => {
            store.release_scheduled(&row.id).await?;
            Err(e)
        }
    }
}

async fn deliver(
    store: &Store,
    generator: &dyn Generator,
    mailer: &dyn Mailer,
    row: &ScheduledMessage,
    message_type: MessageType,
) -> Result<(), SolaceError> {
    let Some(user) = store.find_user(&row.user_id).await? else {
        warn!("scheduler: user {} vanished, skipping {}", row.user_id, row.id);
        store.mark_scheduled(&row.id, ScheduleStatus::Skipped).await?;
        return Ok(());
    };

    let Some(checkin) = store.find_latest_checkin(&row.user_id).await? else {
        warn!("scheduler: no check-in for {}, skipping {}", row.user_id, row.id);
        store.mark_scheduled(&row.id, ScheduleStatus::Skipped).await?;
        return Ok(());
    };

    let turns = store.list_turns(&row.user_id, &checkin.id).await?;
    let kinds: Vec<_> = turns.iter().filter_map(|t| t.kind()).collect();

    // Trigger takes precedence: the recommendation replaces this stage
    // and the chain ends for the day.
    if recommendation_due(&kinds) {
        recommend::run_recommendation(store, generator, mailer, &user, &checkin).await?;
        store.mark_scheduled(&row.id, ScheduleStatus::Skipped).await?;
        info!("scheduler: {} replaced by recommendation for {}", row.id, user.id);
        return Ok(());
    }

    let event_title = match &row.event_id {
        Some(event_id) => store
            .list_events(&row.user_id, &checkin.id)
            .await?
            .into_iter()
            .find(|e| &e.id == event_id)
            .map(|e| e.title),
        None => None,
    };

    let text = proactive::generate_nudge(
        generator,
        &user,
        &checkin,
        &turns,
        message_type,
        event_title.as_deref(),
    )
    .await?;

    store
        .insert_turn(&row.user_id, &checkin.id, TurnRole::Assistant, &text, message_type)
        .await?;

    // Email delivery is best-effort: the turn is the source of truth.
    let (subject, html) = proactive::render_email(&user, message_type, &text);
    if let Err(e) = mailer.send(&user.email, &subject, &html).await {
        warn!("scheduler: email for {} failed: {e}", row.id);
    }

    store.mark_scheduled(&row.id, ScheduleStatus::Sent).await?;
    info!("scheduler: delivered {} ({}) to {}", row.id, message_type.as_str(), user.id);

    // Advance the chain, unless the successor is already on the books.
    if let Some(next) = message_type.next_in_chain() {
        if store.find_scheduled(&row.user_id, next, &CHAIN_GUARD).await?.is_none() {
            let when = schedule::chained_for(next, row.is_fast, schedule::now_local());
            store
                .insert_scheduled(&row.user_id, None, schedule::to_utc(when), next, row.is_fast)
                .await?;
            info!(
                "scheduler: chained {} for {} at {when}",
                next.as_str(),
                row.user_id
            );
        }
    }

    Ok(())
}
