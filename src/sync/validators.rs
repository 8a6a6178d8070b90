use std::any::Any;
use std::collections::HashMap;

use chrono::NaiveDate;

use super::model::Model;
use super::models::{AddrObj, House};

type Rule = Box<dyn Fn(&dyn Any, NaiveDate) -> bool + Send + Sync>;

/// Per-table record rules. A table without a rule accepts every record.
#[derive(Default)]
pub struct Validators {
    rules: HashMap<&'static str, Rule>,
}

impl Validators {
    /// Rules for the stock FIAS tables.
    pub fn fias() -> Self {
        let mut validators = Validators::default();
        validators
            .register::<AddrObj, _>(addrobj_validator)
            .register::<House, _>(house_validator);
        validators
    }

    pub fn register<M, F>(&mut self, rule: F) -> &mut Self
    where
        M: Model,
        F: Fn(&M, NaiveDate) -> bool + Send + Sync + 'static,
    {
        self.rules.insert(
            M::TABLE,
            Box::new(move |item: &dyn Any, today| {
                item.downcast_ref::<M>()
                    .map_or(true, |item| rule(item, today))
            }),
        );
        self
    }

    pub fn validate<M: Model>(&self, item: &M, today: NaiveDate) -> bool {
        self.rules
            .get(M::TABLE)
            .map_or(true, |rule| rule(item, today))
    }
}

fn is_current(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> bool {
    start <= today && today < end
}

fn addrobj_validator(item: &AddrObj, today: NaiveDate) -> bool {
    item.actstatus == 1 && item.livestatus && is_current(item.startdate, item.enddate, today)
}

fn house_validator(item: &House, today: NaiveDate) -> bool {
    is_current(item.startdate, item.enddate, today)
}
