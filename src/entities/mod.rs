pub mod erp_token;
pub mod inventory_reservation;
pub mod order;
pub mod order_line;

pub use erp_token::Entity as ErpToken;
pub use inventory_reservation::Entity as InventoryReservation;
pub use order::Entity as Order;
pub use order_line::Entity as OrderLine;
