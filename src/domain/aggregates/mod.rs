//! Aggregates module
pub mod invoice;
pub mod order;
pub mod payment;
pub mod print_file;
pub mod service;

pub use invoice::{Invoice, InvoiceKind, InvoiceLine};
pub use order::{
    ClientOrderUpdate, ClientSnapshot, Order, OrderLineItem, OrderPaymentStatus, OrderStatus,
    Priority, ResolvedItem, ServiceSnapshot, StaffOrderUpdate,
};
pub use payment::{Payment, PaymentMethod, PaymentStatus, Refund};
pub use print_file::{FileFormat, FileStatus, FileValidation, PrintFile, QualityTier};
pub use service::{OptionKind, Quote, Service, ServiceCategory, ServiceOption, ServiceUpdate};
