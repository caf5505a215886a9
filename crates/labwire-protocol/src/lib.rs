pub mod assembler;
pub mod builder;
pub mod checksum;
pub mod codec;
pub mod control;
pub mod frame;
pub mod normalizer;
pub mod record;
pub mod session;

pub use assembler::{AssemblerConfig, AssemblerEvent, DrainEvents, FrameAssembler};
pub use builder::{FrameBuilder, TransmissionBuilder};
pub use codec::AstmCodec;
pub use control::ControlByte;
pub use frame::{DecodedFrame, FrameError, RawFrame, hex_dump};
pub use normalizer::ResultNormalizer;
pub use record::{Record, RecordParser};
pub use session::{DiscardReason, LinkStats, Session, SessionConfig, SessionEvent, SessionState};
