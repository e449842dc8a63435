pub mod access_policies;
pub mod audit_logs;
pub mod cart_items;
pub mod order_items;
pub mod orders;
pub mod profiles;
pub mod revision_images;
pub mod revisions;
pub mod services;
pub mod uploaded_images;

pub use access_policies::Entity as AccessPolicies;
pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use profiles::Entity as Profiles;
pub use revision_images::Entity as RevisionImages;
pub use revisions::Entity as Revisions;
pub use services::Entity as Services;
pub use uploaded_images::Entity as UploadedImages;
