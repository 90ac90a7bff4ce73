use arcstr::ArcStr;
use thiserror::Error;

use super::{InstanceId, NetId, PinId};

#[derive(Debug, Error)]
pub enum NetlistError {
    #[error("net {0:?} does not exist")]
    UnknownNet(NetId),

    #[error("pin {0:?} does not exist")]
    UnknownPin(PinId),

    #[error("instance {0:?} does not exist")]
    UnknownInstance(InstanceId),

    #[error("a net named `{0}` already exists")]
    DuplicateNet(ArcStr),

    #[error("an instance named `{0}` already exists")]
    DuplicateInstance(ArcStr),

    #[error("a port named `{0}` already exists")]
    DuplicatePort(ArcStr),

    #[error("cell `{cell}` has no port with index {index}")]
    UnknownCellPort { cell: ArcStr, index: usize },
}

pub type NetlistResult<T> = std::result::Result<T, NetlistError>;
