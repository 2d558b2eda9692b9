//! Command handling infrastructure.

use std::marker::PhantomData;

use common::OrderId;
use event_store::{EventStore, RecordedEvent, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The stream version after the command.
    pub new_version: Version,
}

/// Handler for executing commands against aggregates.
///
/// The handler:
/// 1. Replays the aggregate from the event store
/// 2. Runs the command to produce events
/// 3. Appends the events, expecting the version it loaded
/// 4. Applies the events to the in-memory aggregate
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replays an aggregate from its stream.
    ///
    /// An order without events yields a default instance.
    pub async fn load(&self, order_id: OrderId) -> Result<A, DomainError> {
        let records = self.store.load(order_id).await?;

        let mut aggregate = A::default();
        for record in records {
            let event: A::Event = serde_json::from_value(record.payload)?;
            aggregate.apply(event);
            aggregate.set_version(record.version);
        }

        Ok(aggregate)
    }

    /// Replays an aggregate, returning None if it has never been created.
    pub async fn load_existing(&self, order_id: OrderId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(order_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Executes a command and persists the resulting events.
    ///
    /// The command function receives the current state and returns the events
    /// to append, or an error that leaves the stream untouched.
    pub async fn execute<F>(
        &self,
        order_id: OrderId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let aggregate = self.load(order_id).await?;
        self.run(order_id, aggregate, command_fn).await
    }

    /// Like [`execute`](Self::execute), but fails with `OrderNotFound` when
    /// the aggregate has no events yet.
    pub async fn execute_existing<F>(
        &self,
        order_id: OrderId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let aggregate = self
            .load_existing(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))?;
        self.run(order_id, aggregate, command_fn).await
    }

    async fn run<F>(
        &self,
        order_id: OrderId,
        mut aggregate: A,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let current_version = aggregate.version();
        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_version: current_version,
            });
        }

        let records = self.build_records(order_id, current_version, &events)?;
        let new_version = self
            .store
            .append(order_id, current_version, records)
            .await?;

        for event in &events {
            aggregate.apply(event.clone());
        }
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    fn build_records(
        &self,
        order_id: OrderId,
        current_version: Version,
        events: &[A::Event],
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        let mut records = Vec::with_capacity(events.len());
        let mut version = current_version;

        for event in events {
            version = version.next();
            records.push(RecordedEvent::new(
                order_id,
                version,
                event.event_type(),
                event,
            )?);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::InMemoryEventStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum NoteEvent {
        Created { id: OrderId, text: String },
        Edited { text: String },
    }

    impl DomainEvent for NoteEvent {
        fn event_type(&self) -> &'static str {
            match self {
                NoteEvent::Created { .. } => "NoteCreated",
                NoteEvent::Edited { .. } => "NoteEdited",
            }
        }
    }

    #[derive(Debug, Default)]
    struct Note {
        id: Option<OrderId>,
        text: String,
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("empty note")]
    struct EmptyNote;

    impl From<EmptyNote> for DomainError {
        fn from(_: EmptyNote) -> Self {
            DomainError::Order(crate::order::OrderError::EmptyOrder)
        }
    }

    impl Aggregate for Note {
        type Event = NoteEvent;
        type Error = EmptyNote;

        fn id(&self) -> Option<OrderId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                NoteEvent::Created { id, text } => {
                    self.id = Some(id);
                    self.text = text;
                }
                NoteEvent::Edited { text } => self.text = text,
            }
        }
    }

    fn create(id: OrderId) -> impl FnOnce(&Note) -> Result<Vec<NoteEvent>, EmptyNote> {
        move |_| {
            Ok(vec![NoteEvent::Created {
                id,
                text: "first".to_string(),
            }])
        }
    }

    #[tokio::test]
    async fn execute_creates_and_versions() {
        let handler: CommandHandler<_, Note> = CommandHandler::new(InMemoryEventStore::new());
        let id = OrderId::new();

        let result = handler.execute(id, create(id)).await.unwrap();
        assert_eq!(result.new_version, Version::first());
        assert_eq!(result.aggregate.text, "first");

        let result = handler
            .execute(id, |_| {
                Ok(vec![NoteEvent::Edited {
                    text: "second".to_string(),
                }])
            })
            .await
            .unwrap();
        assert_eq!(result.new_version, Version::new(2));

        let reloaded = handler.load(id).await.unwrap();
        assert_eq!(reloaded.text, "second");
        assert_eq!(reloaded.version(), Version::new(2));
    }

    #[tokio::test]
    async fn failed_command_writes_nothing() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Note> = CommandHandler::new(store.clone());

        let result = handler.execute(OrderId::new(), |_| Err(EmptyNote)).await;

        assert!(result.is_err());
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn execute_existing_requires_a_stream() {
        let handler: CommandHandler<_, Note> = CommandHandler::new(InMemoryEventStore::new());
        let id = OrderId::new();

        let result = handler.execute_existing(id, |_| Ok(vec![])).await;
        assert!(matches!(result, Err(DomainError::OrderNotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn empty_event_list_returns_without_persisting() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Note> = CommandHandler::new(store.clone());
        let id = OrderId::new();
        handler.execute(id, create(id)).await.unwrap();

        let result = handler.execute(id, |_| Ok(vec![])).await.unwrap();

        assert!(result.events.is_empty());
        assert_eq!(result.new_version, Version::first());
        assert_eq!(store.event_count().await, 1);
    }
}
