//! Change events emitted by graph mutations.
//!
//! Every [`BlockGraph`](crate::graph::BlockGraph) mutation queues one
//! [`ChangeEvent`]. The event carries the affected block's kind so that
//! dispatch works even after the block has been deleted.

use crate::block::BlockKind;
use crate::id::BlockId;
use crate::mutator::ParamChange;

/// The dispatch key of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeEventKind {
    Create,
    Delete,
    Change,
    Move,
    FinishedLoading,
    Ui,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    Created,
    Deleted,
    FieldChanged {
        field: String,
        old: Option<String>,
        new: String,
    },
    /// Extra state replaced wholesale.
    MutationChanged,
    /// A declaration's parameter list was recomposed.
    SignatureChanged { changes: Vec<ParamChange> },
    Moved {
        old_parent: Option<BlockId>,
        new_parent: Option<BlockId>,
    },
    FinishedLoading,
    Ui { element: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub block: Option<BlockId>,
    pub block_kind: Option<BlockKind>,
    pub payload: EventPayload,
}

impl ChangeEvent {
    pub fn for_block(id: BlockId, kind: BlockKind, payload: EventPayload) -> Self {
        ChangeEvent {
            block: Some(id),
            block_kind: Some(kind),
            payload,
        }
    }

    pub fn finished_loading() -> Self {
        ChangeEvent {
            block: None,
            block_kind: None,
            payload: EventPayload::FinishedLoading,
        }
    }

    pub fn kind(&self) -> ChangeEventKind {
        match self.payload {
            EventPayload::Created => ChangeEventKind::Create,
            EventPayload::Deleted => ChangeEventKind::Delete,
            EventPayload::FieldChanged { .. }
            | EventPayload::MutationChanged
            | EventPayload::SignatureChanged { .. } => ChangeEventKind::Change,
            EventPayload::Moved { .. } => ChangeEventKind::Move,
            EventPayload::FinishedLoading => ChangeEventKind::FinishedLoading,
            EventPayload::Ui { .. } => ChangeEventKind::Ui,
        }
    }

    /// The edited field name, for field-change events.
    pub fn changed_field(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::FieldChanged { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_payloads_share_one_kind() {
        let field = ChangeEvent::for_block(
            BlockId(1),
            BlockKind::Event,
            EventPayload::FieldChanged {
                field: "NAME".into(),
                old: None,
                new: "x".into(),
            },
        );
        let sig = ChangeEvent::for_block(
            BlockId(1),
            BlockKind::Event,
            EventPayload::SignatureChanged { changes: vec![] },
        );
        assert_eq!(field.kind(), ChangeEventKind::Change);
        assert_eq!(sig.kind(), ChangeEventKind::Change);
        assert_eq!(field.changed_field(), Some("NAME"));
        assert_eq!(sig.changed_field(), None);
    }

    #[test]
    fn finished_loading_has_no_block() {
        let ev = ChangeEvent::finished_loading();
        assert_eq!(ev.kind(), ChangeEventKind::FinishedLoading);
        assert!(ev.block.is_none());
    }
}
