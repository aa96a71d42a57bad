//! Errors of the construction and configuration APIs.
//!
//! The intersection kernels themselves never fail: a miss is a cleared lane in the
//! validity mask.

use thiserror::Error;

/// Errors raised while building batches, packets or configurations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// More quads were supplied than the batch register has lanes.
    #[error("{given} quads do not fit into a batch of {lanes} lanes")]
    BatchOverflow { given: usize, lanes: usize },

    /// More rays were supplied than the packet register has lanes.
    #[error("{given} rays do not fit into a packet of {lanes} lanes")]
    PacketOverflow { given: usize, lanes: usize },

    /// A path preference string did not name a known path.
    #[error("unknown intersection path `{0}`, expected one of: auto, generic, packed")]
    UnknownPath(String),

    /// A culling string did not name a known culling mode.
    #[error("unknown culling mode `{0}`, expected one of: none, backface")]
    UnknownCulling(String),
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn test_messages_name_the_input() {
        let err = Error::BatchOverflow { given: 5, lanes: 4 };
        assert_eq!(err.to_string(), "5 quads do not fit into a batch of 4 lanes");
        let err = Error::UnknownPath("avx".to_string());
        assert!(err.to_string().contains("`avx`"));
    }
}
