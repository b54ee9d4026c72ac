use uuid::Uuid;

pub mod persistence;
pub mod version;

pub fn new_record_id() -> Uuid {
    Uuid::new_v4()
}
