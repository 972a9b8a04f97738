pub mod entitlement_service;
pub use entitlement_service::{Entitlement, EntitlementError, EntitlementService};

pub mod entitlement_service_impl;
pub use entitlement_service_impl::SeaOrmEntitlementService;

pub mod scanner;
pub use scanner::{ScanSummary, SubscriptionScanner};

pub mod scheduler;
pub use scheduler::Scheduler;
