use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::config::ProductionConfig;
use crate::db::{self, Collection, Store};
use crate::error::{ProductionError, Result};
use crate::models::{
    Actor, DeletedOrder, FinishedItem, LogEntry, Order, Outlet, RawItem, Role, Staff, Task,
};

pub type Clock = Box<dyn Fn() -> NaiveDateTime + Send>;

/// Owns every production collection and the store they are written through.
///
/// Mutations take `&mut self`, so a single owner never interleaves the
/// check-then-decrement sequences of planning and inventory accounting.
/// Share across threads by wrapping in `Arc<Mutex<Production>>`.
pub struct Production {
    store: Box<dyn Store>,
    config: ProductionConfig,
    clock: Clock,
    actor: Option<Actor>,
    pub(crate) roles: Vec<Role>,
    pub(crate) staff: Vec<Staff>,
    pub(crate) outlets: Vec<Outlet>,
    pub(crate) raw_items: Vec<RawItem>,
    pub(crate) finished_items: Vec<FinishedItem>,
    pub(crate) orders: Vec<Order>,
    pub(crate) deleted_orders: Vec<DeletedOrder>,
    pub(crate) tasks: Vec<Task>,
    pub(crate) logs: Vec<LogEntry>,
}

impl Production {
    pub fn open(store: impl Store + 'static, config: ProductionConfig) -> Result<Self> {
        let store: Box<dyn Store> = Box::new(store);

        let production = Production {
            roles: db::load(store.as_ref(), Collection::Roles)?,
            staff: db::load(store.as_ref(), Collection::Staff)?,
            outlets: db::load(store.as_ref(), Collection::Outlets)?,
            raw_items: db::load(store.as_ref(), Collection::RawItems)?,
            finished_items: db::load(store.as_ref(), Collection::FinishedItems)?,
            orders: db::load(store.as_ref(), Collection::Orders)?,
            deleted_orders: db::load(store.as_ref(), Collection::DeletedOrders)?,
            tasks: db::load(store.as_ref(), Collection::Tasks)?,
            logs: db::load(store.as_ref(), Collection::Logs)?,
            store,
            config,
            clock: Box::new(|| chrono::Local::now().naive_local()),
            actor: None,
        };

        tracing::info!(
            orders = production.orders.len(),
            tasks = production.tasks.len(),
            "production state loaded"
        );

        Ok(production)
    }

    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &ProductionConfig {
        &self.config
    }

    pub fn set_actor(&mut self, actor: Option<Actor>) {
        self.actor = actor;
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    /// Append-only activity feed, oldest first.
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub(crate) fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub(crate) fn persist(&self, collection: Collection) -> Result<()> {
        let store = self.store.as_ref();
        match collection {
            Collection::Roles => db::save(store, collection, &self.roles),
            Collection::Staff => db::save(store, collection, &self.staff),
            Collection::Outlets => db::save(store, collection, &self.outlets),
            Collection::RawItems => db::save(store, collection, &self.raw_items),
            Collection::FinishedItems => db::save(store, collection, &self.finished_items),
            Collection::Orders => db::save(store, collection, &self.orders),
            Collection::DeletedOrders => db::save(store, collection, &self.deleted_orders),
            Collection::Tasks => db::save(store, collection, &self.tasks),
            Collection::Logs => db::save(store, collection, &self.logs),
        }
    }

    pub(crate) fn persist_all(&self, collections: &[Collection]) -> Result<()> {
        for collection in collections {
            self.persist(*collection)?;
        }
        Ok(())
    }

    /// Appends to the activity feed, stamped with the current session actor.
    pub(crate) fn record(&mut self, kind: &str, message: impl Into<String>) -> Result<()> {
        let entry = LogEntry {
            id: Self::new_id(),
            ts: self.now(),
            kind: kind.to_string(),
            message: message.into(),
            actor_id: self.actor.as_ref().map(|a| a.id.clone()),
            actor_name: self.actor.as_ref().map(|a| a.name.clone()),
        };
        self.logs.push(entry);
        self.persist(Collection::Logs)
    }

    pub(crate) fn task_mut(&mut self, id: &str) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ProductionError::not_found("task", id))
    }

    pub(crate) fn order_ref(&self, id: &str) -> Result<&Order> {
        self.orders
            .iter()
            .find(|o| o.id == id)
            .ok_or_else(|| ProductionError::not_found("order", id))
    }
}
