/// Slot identity for one playback attempt.
///
/// A sound can play from several boards at once; each (board, sound) pair is
/// its own slot with its own player. A board-less key is the slot used for
/// ad-hoc preview playback while editing.
use std::fmt;

/// Identifier of a sound in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundId(pub u64);

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound:{}", self.0)
    }
}

/// Identifier of a soundboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoardId(pub u64);

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "board:{}", self.0)
    }
}

/// Key of one playback slot: an optional board plus a mandatory sound.
///
/// Equality is structural; "no board" matches only "no board".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackKey {
    pub board: Option<BoardId>,
    pub sound: SoundId,
}

impl PlaybackKey {
    /// Slot for a sound triggered from a board
    pub fn on_board(board: BoardId, sound: SoundId) -> Self {
        Self {
            board: Some(board),
            sound,
        }
    }

    /// Board-less slot for ad-hoc preview playback
    pub fn preview(sound: SoundId) -> Self {
        Self {
            board: None,
            sound,
        }
    }

    /// Whether this is the board-less preview slot for its sound
    pub fn is_preview(&self) -> bool {
        self.board.is_none()
    }
}

impl fmt::Display for PlaybackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.board {
            Some(board) => write!(f, "{}/{}", board, self.sound),
            None => write!(f, "preview/{}", self.sound),
        }
    }
}
