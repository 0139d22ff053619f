//! Weekly auto-post trigger.
//!
//! Fires once a week at a fixed local weekday and time and queues a
//! scheduled recap for every guild that has auto-posting enabled.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use tracing::{error, info};

use crate::config::AutopostSchedule;
use crate::managers::job_queue::{JobQueue, RecapJob};
use crate::state::SharedSettingsStore;

/// First firing strictly after `now`.
///
/// A local time skipped by a DST change fires one hour later; an ambiguous
/// one fires at its first occurrence.
pub fn next_fire_after(now: DateTime<Utc>, schedule: &AutopostSchedule) -> DateTime<Utc> {
    let tz = schedule.timezone;
    let today = now.with_timezone(&tz).date_naive();

    (0..=14)
        .filter_map(|offset| today.checked_add_signed(Duration::days(offset)))
        .filter(|date| date.weekday() == schedule.weekday)
        .filter_map(|date| {
            let local = date.and_time(schedule.time);
            tz.from_local_datetime(&local)
                .earliest()
                .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        })
        .map(|fire| fire.with_timezone(&Utc))
        .find(|fire| *fire > now)
        .unwrap_or_else(|| now + Duration::weeks(1))
}

/// Next firing after the later of `now` and the previous firing, so a clock
/// that reads behind `last_fire` never repeats it
pub fn next_fire_since(
    now: DateTime<Utc>,
    last_fire: Option<DateTime<Utc>>,
    schedule: &AutopostSchedule,
) -> DateTime<Utc> {
    let from = last_fire.map_or(now, |last| now.max(last));
    next_fire_after(from, schedule)
}

/// Queue one scheduled job per auto-posting guild; returns how many were queued
pub async fn enqueue_scheduled(settings: &SharedSettingsStore, queue: &JobQueue) -> usize {
    let guilds = settings.read().await.autopost_guilds();
    let mut queued = 0;
    for (guild_id, guild_settings) in guilds {
        let Some(channel_id) = guild_settings.channel() else {
            continue;
        };
        match queue.enqueue(RecapJob::scheduled(guild_id, channel_id)) {
            Ok(_) => queued += 1,
            Err(e) => error!("Failed to queue scheduled recap for guild {}: {}", guild_id, e),
        }
    }
    queued
}

/// Run forever, queueing scheduled recaps at every firing
pub async fn run(settings: SharedSettingsStore, queue: JobQueue, schedule: AutopostSchedule) {
    info!(
        "Weekly auto-post scheduled for {:?} {} ({})",
        schedule.weekday, schedule.time, schedule.timezone
    );

    let mut last_fire = None;
    loop {
        let now = Utc::now();
        let next = next_fire_since(now, last_fire, &schedule);
        info!("Next auto-post at {}", next.with_timezone(&schedule.timezone));

        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        last_fire = Some(next);
        let queued = enqueue_scheduled(&settings, &queue).await;
        info!("Auto-post fired: queued {} recap(s)", queued);
    }
}
