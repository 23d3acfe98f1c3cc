// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-tick dispatch algorithm.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use pingrelay_core::{ErrorCode, PhoneStatus, PingRelayError, ScheduleStatus};
use pingrelay_storage::queries::{deliveries, phones, schedules, templates};
use pingrelay_storage::{Database, MessageSnapshot, ResolvedMessage, Schedule};
use pingrelay_waha::WahaClient;
use pingrelay_waha::pacing::random_delay;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::calculator::is_due;
use crate::substitute::substitute;

/// Knobs for a dispatch run, passed explicitly so the CLI and the HTTP
/// trigger can differ from tests.
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    /// Skip the due check and send everything unsent now (dev tool).
    pub force_send: bool,
    /// Uniform random pause between consecutive sends, in seconds.
    pub message_delay: (u64, u64),
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            force_send: false,
            message_delay: (5, 20),
        }
    }
}

/// What one tick did, returned to the caller as JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// Schedules examined.
    pub processed: u64,
    /// Messages whose due time was evaluated.
    pub messages_checked: u64,
    /// Messages actually delivered this tick.
    pub messages_sent: u64,
    /// Failures of any kind, none of which abort the tick.
    pub errors: u64,
    /// Schedules that reached `completed` this tick.
    pub schedules_completed: u64,
}

/// Runs dispatch ticks against one database and one WAHA gateway.
#[derive(Clone)]
pub struct DispatchEngine {
    db: Arc<Database>,
    waha: Arc<WahaClient>,
    options: DispatchOptions,
}

impl DispatchEngine {
    pub fn new(db: Arc<Database>, waha: Arc<WahaClient>, options: DispatchOptions) -> Self {
        Self { db, waha, options }
    }

    /// Executes one tick over every active schedule.
    ///
    /// Per-message and per-schedule failures are recorded in the ledger and
    /// counted; only infrastructure failure (the schedule listing itself)
    /// returns an error.
    pub async fn run_tick(&self) -> Result<TickSummary, PingRelayError> {
        let mut summary = TickSummary::default();
        let active = schedules::list_active(&self.db).await?;
        debug!(schedules = active.len(), "tick started");

        for schedule in active {
            summary.processed += 1;
            if let Err(e) = self.process_schedule(&schedule, &mut summary).await {
                warn!(schedule_id = %schedule.id, error = %e, "schedule processing failed");
                summary.errors += 1;
            }
        }

        info!(
            processed = summary.processed,
            checked = summary.messages_checked,
            sent = summary.messages_sent,
            errors = summary.errors,
            completed = summary.schedules_completed,
            "tick finished"
        );
        Ok(summary)
    }

    async fn process_schedule(
        &self,
        schedule: &Schedule,
        summary: &mut TickSummary,
    ) -> Result<(), PingRelayError> {
        let template = match templates::get_template(&self.db, &schedule.template_id).await? {
            Some(t) => t,
            None => {
                warn!(
                    schedule_id = %schedule.id,
                    template_id = %schedule.template_id,
                    code = %ErrorCode::TemplateNotFound,
                    "template missing, failing schedule"
                );
                schedules::update_status(&self.db, &schedule.id, ScheduleStatus::Failed).await?;
                summary.errors += 1;
                return Ok(());
            }
        };

        let messages = match templates::resolve_messages(&self.db, &template).await {
            Ok(m) => m,
            Err(e) => {
                warn!(
                    schedule_id = %schedule.id,
                    error = %e,
                    code = %ErrorCode::TemplateNotFound,
                    "template unusable, failing schedule"
                );
                schedules::update_status(&self.db, &schedule.id, ScheduleStatus::Failed).await?;
                summary.errors += 1;
                return Ok(());
            }
        };

        if messages.is_empty() {
            schedules::update_status(&self.db, &schedule.id, ScheduleStatus::Completed).await?;
            summary.schedules_completed += 1;
            return Ok(());
        }

        let total = messages.len() as i64;
        // Group membership is per phone; each sender must see the group in
        // its own chat list, so the lookup cache is keyed by phone number.
        let mut group_ids: HashMap<String, String> = HashMap::new();
        let mut sent_this_tick = 0u64;

        for message in &messages {
            summary.messages_checked += 1;
            let sent = self
                .process_message(schedule, message, &mut group_ids, summary)
                .await?;
            if sent {
                sent_this_tick += 1;
                summary.messages_sent += 1;
                if schedule.status == ScheduleStatus::Pending && sent_this_tick == 1 {
                    schedules::update_status(&self.db, &schedule.id, ScheduleStatus::Running)
                        .await?;
                }
                let (min, max) = self.options.message_delay;
                tokio::time::sleep(random_delay(min as f64, max as f64)).await;
            }
        }

        let stats = deliveries::stats_for_schedule(&self.db, &schedule.id, total).await?;
        if stats.sent == total {
            schedules::update_status(&self.db, &schedule.id, ScheduleStatus::Completed).await?;
            summary.schedules_completed += 1;
            info!(schedule_id = %schedule.id, total, "schedule completed");
        }
        Ok(())
    }

    /// Attempts one message. Returns true if it was sent this tick.
    async fn process_message(
        &self,
        schedule: &Schedule,
        message: &ResolvedMessage,
        group_ids: &mut HashMap<String, String>,
        summary: &mut TickSummary,
    ) -> Result<bool, PingRelayError> {
        let timing = match &message.timing {
            Ok(t) => t,
            Err(e) => {
                warn!(
                    schedule_id = %schedule.id,
                    index = message.index,
                    error = %e,
                    "unparseable timing spec, skipping message"
                );
                summary.errors += 1;
                return Ok(false);
            }
        };

        if !self.options.force_send && !is_due(Utc::now(), schedule.event_date, timing) {
            return Ok(false);
        }

        // Skip anything already delivered; this is what makes ticks idempotent.
        if let Some(existing) =
            deliveries::get_delivery(&self.db, &schedule.id, message.index).await?
        {
            if existing.status == pingrelay_core::DeliveryStatus::Sent {
                return Ok(false);
            }
        }

        let body = substitute(&message.body, &schedule.variables);
        let snapshot = MessageSnapshot {
            group_name: schedule.group_name.clone(),
            send_time_type: message.send_time_type.clone(),
            send_on_day: message.send_on_day.clone(),
            send_on_hour: message.send_on_hour.clone(),
            body: body.clone(),
            image: message.image.clone(),
            video: message.video.clone(),
        };
        let delivery = deliveries::find_or_create(
            &self.db,
            &schedule.id,
            message.index,
            message.id.as_deref(),
            &message.phone_id,
            &snapshot,
        )
        .await?;

        let phone = match phones::get_phone(&self.db, &message.phone_id).await? {
            Some(p) => p,
            None => {
                deliveries::mark_failed(
                    &self.db,
                    &delivery.id,
                    ErrorCode::PhoneNotFound,
                    Some(&message.phone_id),
                    &format!("phone {} is not registered", message.phone_id),
                )
                .await?;
                summary.errors += 1;
                return Ok(false);
            }
        };

        if phone.status != PhoneStatus::Connected {
            deliveries::mark_failed(
                &self.db,
                &delivery.id,
                ErrorCode::PhoneNotConnected,
                Some(&phone.id),
                &format!("phone {} is not connected", phone.number),
            )
            .await?;
            summary.errors += 1;
            return Ok(false);
        }

        let group_id = match self
            .resolve_group_id(&delivery, &phone.number, &schedule.group_name, group_ids)
            .await
        {
            Ok(id) => id,
            Err(code) => {
                deliveries::mark_failed(
                    &self.db,
                    &delivery.id,
                    code,
                    Some(&schedule.group_name),
                    &format!("group '{}' could not be resolved", schedule.group_name),
                )
                .await?;
                summary.errors += 1;
                return Ok(false);
            }
        };
        deliveries::set_group_id(&self.db, &delivery.id, &group_id).await?;

        let waha_response = match self.waha.send_text(&phone.number, &group_id, &body).await {
            Ok(response) => response,
            Err(e) => {
                deliveries::mark_failed(
                    &self.db,
                    &delivery.id,
                    ErrorCode::MessageSendFailed,
                    None,
                    &e.to_string(),
                )
                .await?;
                summary.errors += 1;
                return Ok(false);
            }
        };
        deliveries::mark_sent(&self.db, &delivery.id, Some(&waha_response)).await?;
        debug!(schedule_id = %schedule.id, index = message.index, "message sent");

        // Attachment failures are logged but never fail a delivered message.
        if let Some(url) = &message.image {
            if let Err(e) = self
                .waha
                .send_image(&phone.number, &group_id, url, None)
                .await
            {
                deliveries::append_log(
                    &self.db,
                    &delivery.id,
                    Some(ErrorCode::ImageSendFailed),
                    Some(url),
                    Some(&e.to_string()),
                )
                .await?;
                summary.errors += 1;
            }
        }
        if let Some(url) = &message.video {
            if let Err(e) = self
                .waha
                .send_video(&phone.number, &group_id, url, None)
                .await
            {
                deliveries::append_log(
                    &self.db,
                    &delivery.id,
                    Some(ErrorCode::VideoSendFailed),
                    Some(url),
                    Some(&e.to_string()),
                )
                .await?;
                summary.errors += 1;
            }
        }

        Ok(true)
    }

    /// Resolves the conversation id for one delivery.
    ///
    /// A previously stored id on the delivery wins; otherwise the sending
    /// phone's own chat list is searched, cached per phone number. A group
    /// another phone resolved is never reused, since each sender must be a
    /// member of the group itself.
    async fn resolve_group_id(
        &self,
        delivery: &pingrelay_storage::Delivery,
        phone_number: &str,
        group_name: &str,
        cache: &mut HashMap<String, String>,
    ) -> Result<String, ErrorCode> {
        if let Some(id) = &delivery.group_id {
            if !id.is_empty() {
                return Ok(id.clone());
            }
            return Err(ErrorCode::GroupIdMissing);
        }
        if let Some(id) = cache.get(phone_number) {
            return Ok(id.clone());
        }
        match self.waha.find_group_id(phone_number, group_name).await {
            Some(id) if id.is_empty() => Err(ErrorCode::GroupIdMissing),
            Some(id) => {
                cache.insert(phone_number.to_string(), id.clone());
                Ok(id)
            }
            None => Err(ErrorCode::GroupNotFound),
        }
    }
}
