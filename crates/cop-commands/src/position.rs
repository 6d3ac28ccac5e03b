//! Position and operation-event command processing.

use std::sync::Arc;

use chrono::Utc;
use cop_db::UnitRepository;
use cop_hub::{EventPublisher, PublishReport};
use cop_types::{
    DomainEvent, EVENT_CONNECTED, EVENT_POSITION_UPDATE, FRAME_ERROR, FRAME_NEW_MESSAGE,
    FRAME_SYSTEM_MESSAGE, PositionUpdate, StreamKind, TopicKey, UnitPosition,
};
use tracing::info;
use validator::Validate;

use crate::error::CommandError;

/// Event names the relay emits itself; callers may not reuse them.
const RESERVED_EVENT_NAMES: [&str; 5] = [
    EVENT_CONNECTED,
    EVENT_POSITION_UPDATE,
    FRAME_NEW_MESSAGE,
    FRAME_SYSTEM_MESSAGE,
    FRAME_ERROR,
];

/// Processes position reports and operation events.
pub struct PositionCommandProcessor {
    units: Arc<dyn UnitRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl PositionCommandProcessor {
    /// Create a processor over a unit store and a publisher.
    pub fn new(units: Arc<dyn UnitRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { units, publisher }
    }

    /// Move unit `call_sign` and publish its new position to the
    /// operation's position subscribers.
    ///
    /// Latitude and longitude are checked before the store is touched.
    ///
    /// # Errors
    ///
    /// [`CommandError::Validation`] for a missing coordinate,
    /// [`CommandError::UnitNotFound`] for an unknown call sign,
    /// [`CommandError::Persistence`] when the store fails.
    pub async fn update_position(
        &self,
        topic: &TopicKey,
        call_sign: &str,
        update: &PositionUpdate,
    ) -> Result<UnitPosition, CommandError> {
        update.validate()?;
        let fix = update.fix().ok_or_else(|| {
            CommandError::Validation(String::from("latitude and longitude are required"))
        })?;

        let unit = self
            .units
            .find_by_call_sign(call_sign)
            .await?
            .ok_or_else(|| CommandError::UnitNotFound(call_sign.to_owned()))?;
        let saved = self
            .units
            .save_unit(unit.with_position(&fix, Utc::now()))
            .await?;

        let position = UnitPosition::from(&saved);
        let report = self.publisher.publish(
            topic,
            StreamKind::Position,
            &DomainEvent::position_update(topic, position.clone()),
        );
        info!(
            operation = %topic,
            unit = %call_sign,
            delivered = report.delivered,
            "Unit position updated"
        );
        Ok(position)
    }

    /// Push a caller-named event to the operation's event subscribers.
    ///
    /// # Errors
    ///
    /// [`CommandError::Validation`] when `name` is blank, contains a line
    /// break (it becomes the server-push event name), or is one of the
    /// names the relay emits itself, such as `connected`.
    pub fn broadcast_operation_event(
        &self,
        topic: &TopicKey,
        name: &str,
        data: serde_json::Value,
    ) -> Result<PublishReport, CommandError> {
        let name = name.trim();
        if name.is_empty() || name.contains(['\n', '\r']) {
            return Err(CommandError::Validation(String::from(
                "event name must be a single non-empty line",
            )));
        }
        if RESERVED_EVENT_NAMES.contains(&name) {
            return Err(CommandError::Validation(format!(
                "event name {name} is reserved"
            )));
        }
        Ok(self.publisher.publish(
            topic,
            StreamKind::Event,
            &DomainEvent::operation(topic, name, data),
        ))
    }
}
