pub mod draft;
pub mod identity;
pub mod work_item;
