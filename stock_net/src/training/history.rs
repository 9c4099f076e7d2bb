use serde::{Deserialize, Serialize};

/// The losses of a single epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    /// Mean of the batch losses of the epoch.
    pub training_loss: f64,
    pub validation_loss: f64,
}

/// The append-only sequence of epoch records of a training run.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    records: Vec<EpochRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: EpochRecord) {
        self.records.push(record);
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    pub fn records(&self) -> &[EpochRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&EpochRecord> {
        self.records.last()
    }

    /// Returns the record with the lowest validation loss, the earliest one on ties.
    pub fn best(&self) -> Option<&EpochRecord> {
        self.records.iter().fold(None, |best, record| match best {
            Some(b) if b.validation_loss <= record.validation_loss => Some(b),
            _ if record.validation_loss.is_nan() => best,
            _ => Some(record),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(epoch: usize, validation_loss: f64) -> EpochRecord {
        EpochRecord {
            epoch,
            training_loss: 1.,
            validation_loss,
        }
    }

    #[test]
    fn best_is_the_earliest_minimum() {
        let mut history = History::new();
        for (epoch, loss) in [0.9, 0.4, f64::NAN, 0.4, 0.6].into_iter().enumerate() {
            history.push(record(epoch, loss));
        }

        assert_eq!(history.best().map(|r| r.epoch), Some(1));
        assert_eq!(history.len(), 5);
    }

    #[test]
    fn serializes_as_a_list_of_records() {
        let mut history = History::new();
        history.push(record(0, 0.5));

        let json = serde_json::to_string(&history).unwrap();
        assert_eq!(
            json,
            r#"[{"epoch":0,"training_loss":1.0,"validation_loss":0.5}]"#
        );
    }
}
