use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::entities::patients;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Patient {
    pub id: i32,
    pub ln: Option<String>,
    pub hn: Option<String>,
    pub id_card: Option<String>,
    pub prefix: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<patients::Model> for Patient {
    fn from(model: patients::Model) -> Self {
        Self {
            id: model.id,
            ln: model.ln,
            hn: model.hn,
            id_card: model.id_card,
            prefix: model.prefix,
            first_name: model.first_name,
            last_name: model.last_name,
            age: model.age,
            gender: model.gender,
            birth_date: model.birth_date,
            phone: model.phone,
            address: model.address,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
