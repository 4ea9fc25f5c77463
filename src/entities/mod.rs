//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod admin;
pub mod bot_setting;
pub mod category;
pub mod course;
pub mod course_request;
pub mod log;
pub mod payment;
pub mod user;

// Re-export specific types to avoid conflicts
pub use admin::{Column as AdminColumn, Entity as Admin, Model as AdminModel};
pub use bot_setting::{Column as BotSettingColumn, Entity as BotSetting, Model as BotSettingModel};
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use course::{Column as CourseColumn, Entity as Course, Model as CourseModel};
pub use course_request::{
    Column as CourseRequestColumn, Entity as CourseRequest, Model as CourseRequestModel,
};
pub use log::{Column as LogColumn, Entity as Log, Model as LogModel};
pub use payment::{
    Column as PaymentColumn, Entity as Payment, Model as PaymentModel, PaymentMethod,
    PaymentStatus,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
