use im::{hashmap::Entry, HashMap};
use types::{nonstandard::LatestMessage, phase0::primitives::ValidatorIndex};

/// Latest messages of validators, keyed by validator index.
///
/// Cloning is cheap. The map is persistent and shares structure with its clones.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct LatestMessages {
    messages: HashMap<ValidatorIndex, LatestMessage>,
}

impl LatestMessages {
    /// Records `message` for the validator unless it already has a message from the same or a
    /// later epoch. Returns `true` if `message` was recorded.
    ///
    /// Messages from the same epoch do not replace each other, so the first one observed wins.
    pub fn merge(&mut self, validator_index: ValidatorIndex, message: LatestMessage) -> bool {
        match self.messages.entry(validator_index) {
            Entry::Occupied(mut occupied) => {
                if message.epoch > occupied.get().epoch {
                    occupied.insert(message);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(message);
                true
            }
        }
    }

    #[must_use]
    pub fn get(&self, validator_index: ValidatorIndex) -> Option<LatestMessage> {
        self.messages.get(&validator_index).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (ValidatorIndex, LatestMessage)> + '_ {
        self.messages
            .iter()
            .map(|(validator_index, message)| (*validator_index, *message))
    }
}

impl Extend<(ValidatorIndex, LatestMessage)> for LatestMessages {
    fn extend<I: IntoIterator<Item = (ValidatorIndex, LatestMessage)>>(&mut self, messages: I) {
        for (validator_index, message) in messages {
            self.merge(validator_index, message);
        }
    }
}
