//! The customer aggregate.

use chrono::{DateTime, Utc};
use common::CustomerId;
use serde::{Deserialize, Serialize};

use crate::entity::{AggregateRoot, DomainEvent, DomainEvents, Entity};
use crate::result::{Failure, OpResult};

/// Events raised by the customer aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CustomerEvent {
    /// A customer was created.
    CustomerCreated {
        customer_id: CustomerId,
        name: String,
        email: String,
    },

    /// A customer's name was changed.
    CustomerRenamed {
        customer_id: CustomerId,
        name: String,
    },
}

impl DomainEvent for CustomerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CustomerEvent::CustomerCreated { .. } => "CustomerCreated",
            CustomerEvent::CustomerRenamed { .. } => "CustomerRenamed",
        }
    }
}

/// A customer, the owning side of the customer/orders cluster.
///
/// The creation timestamp is `None` until the unit of work assigns it just
/// before commit; it is immutable afterwards. The version field is the
/// optimistic-concurrency marker maintained by the store.
#[derive(Debug, Clone)]
pub struct Customer {
    id: CustomerId,
    name: String,
    email: String,
    created_at: Option<DateTime<Utc>>,
    version: i64,
    events: DomainEvents<CustomerEvent>,
}

impl Customer {
    /// Maximum length of a customer name.
    pub const MAX_NAME_LEN: usize = 100;

    /// Maximum length of a customer email.
    pub const MAX_EMAIL_LEN: usize = 200;

    /// Creates a new customer, raising `CustomerCreated`.
    ///
    /// Fails with a validation failure if the name or email is empty or
    /// over length, before any persistence is attempted.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> OpResult<Self> {
        let name = name.into();
        let email = email.into();
        validate_name(&name)?;
        validate_email(&email)?;

        let id = CustomerId::new();
        let mut customer = Self {
            id,
            name: name.clone(),
            email: email.clone(),
            created_at: None,
            version: 0,
            events: DomainEvents::new(),
        };
        customer.events.raise(CustomerEvent::CustomerCreated {
            customer_id: id,
            name,
            email,
        });
        Ok(customer)
    }

    /// Reconstructs a customer from stored state. Raises no events.
    pub fn hydrate(
        id: CustomerId,
        name: impl Into<String>,
        email: impl Into<String>,
        created_at: DateTime<Utc>,
        version: i64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            created_at: Some(created_at),
            version,
            events: DomainEvents::new(),
        }
    }

    /// Changes the customer's name, raising `CustomerRenamed`.
    pub fn rename(&mut self, name: impl Into<String>) -> OpResult<()> {
        let name = name.into();
        validate_name(&name)?;
        self.name = name.clone();
        self.events.raise(CustomerEvent::CustomerRenamed {
            customer_id: self.id,
            name,
        });
        Ok(())
    }

    /// Returns the customer's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the customer's email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the creation timestamp, if already assigned at commit.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Returns the optimistic-concurrency version.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Assigns the creation timestamp. Called by the unit of work just
    /// before commit for newly-added customers; a timestamp already set is
    /// left untouched.
    pub fn assign_created_at(&mut self, at: DateTime<Utc>) {
        if self.created_at.is_none() {
            self.created_at = Some(at);
        }
    }
}

fn validate_name(name: &str) -> OpResult<()> {
    if name.trim().is_empty() {
        return Err(Failure::validation("Customer name is required"));
    }
    if name.len() > Customer::MAX_NAME_LEN {
        return Err(Failure::validation(format!(
            "Customer name must be at most {} characters",
            Customer::MAX_NAME_LEN
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> OpResult<()> {
    if email.trim().is_empty() {
        return Err(Failure::validation("Customer email is required"));
    }
    if email.len() > Customer::MAX_EMAIL_LEN {
        return Err(Failure::validation(format!(
            "Customer email must be at most {} characters",
            Customer::MAX_EMAIL_LEN
        )));
    }
    Ok(())
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> CustomerId {
        self.id
    }
}

impl AggregateRoot for Customer {
    type Event = CustomerEvent;

    fn pending_events(&self) -> &[CustomerEvent] {
        self.events.pending()
    }

    fn clear_domain_events(&mut self) {
        self.events.clear();
    }

    fn take_domain_events(&mut self) -> Vec<CustomerEvent> {
        self.events.take()
    }
}

// Identity-based equality: attributes do not participate.
impl PartialEq for Customer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Customer {}

impl std::hash::Hash for Customer {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
