use crate::{entries, listener_checkpoints, writers};

impl listener_checkpoints::Model {
    pub fn validated_block_number(&self) -> u64 {
        self.block_number.max(0) as u64
    }
}

impl writers::Model {
    pub fn validated_created_at_block(&self) -> u64 {
        self.created_at_block.unwrap_or(0).max(0) as u64
    }

    /// Manager addresses as stored in the `managers` json array.
    pub fn manager_addresses(&self) -> Vec<String> {
        self.managers
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .filter_map(|value| value.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl entries::Model {
    /// Chain position of the event that last wrote entry content. `None` for
    /// an entry only known from its removal.
    pub fn last_event_position(&self) -> Option<(i64, i64)> {
        self.last_event_block.zip(self.last_event_log_index)
    }
}
