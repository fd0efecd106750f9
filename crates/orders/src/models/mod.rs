//! Domain models backed by `orchard_store::FileStore`.
//!
//! Each model is a thin repository over one collection file, adding domain
//! invariants (status transitions, item/quantity rules, total computation) on
//! top of the store's atomic read-modify-write cycle. Validation always
//! happens before any write: a rejected operation leaves the file untouched.

pub mod cart;
pub mod order;
pub mod payment;
pub mod product;

pub use cart::{Cart, CartError, CartItem, CartRepository};
pub use order::{
    Address, NewOrder, NewOrderItem, Order, OrderError, OrderItem, OrderRepository, StatusChange,
};
pub use payment::{Payment, PaymentError, PaymentRepository};
pub use product::{NewProduct, Product, ProductError, ProductRepository};
