use chrono::NaiveDate;

use crate::errors::StrideResult;
use crate::models::{DateRange, EnhancedFields, LoadRecord, UserId};

/// The external activity database, narrowed to what the core needs.
pub trait IActivityLoadStore: Send + Sync {
    /// Records for `user_id` within `range`, ordered by date ascending.
    fn read_records(&self, user_id: UserId, range: DateRange) -> StrideResult<Vec<LoadRecord>>;

    /// Overwrite the write-back fields of one record. `None` clears them.
    fn write_enhanced_fields(
        &self,
        user_id: UserId,
        date: NaiveDate,
        fields: Option<&EnhancedFields>,
    ) -> StrideResult<()>;

    /// Every user with at least one record.
    fn user_ids(&self) -> StrideResult<Vec<UserId>>;
}
