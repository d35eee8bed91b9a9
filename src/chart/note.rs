//! Chart and ChartNote data model.
//!
//! Times are stored as `f64` seconds throughout — matching the on-disk
//! wire format (§6) one-to-one so (de)serialization never needs a unit
//! conversion.

use ordered_float::OrderedFloat;
use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

use crate::config::Difficulty;

/// One of the three playable lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Lane(u8);

impl Lane {
    pub const COUNT: usize = 3;

    pub fn new(value: u8) -> Option<Self> {
        (value < 3).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Lane {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Lane::new(value).ok_or_else(|| format!("lane out of range: {value}"))
    }
}

/// A single note in a chart.
///
/// `dur_sec == 0.0` denotes a tap note; `dur_sec > 0.0` denotes a hold
/// note whose tail ends at `t_sec + dur_sec`.
///
/// Serializes as the `[t, lane]` / `[t, lane, dur]` tuple the wire format
/// (§6) specifies rather than as a struct, so a tap note round-trips
/// without a spurious `"dur_sec": 0.0` field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartNote {
    pub t_sec: f64,
    pub lane: Lane,
    pub dur_sec: f64,
}

impl Serialize for ChartNote {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_hold() {
            let mut seq = serializer.serialize_seq(Some(3))?;
            seq.serialize_element(&self.t_sec)?;
            seq.serialize_element(&self.lane.get())?;
            seq.serialize_element(&self.dur_sec)?;
            seq.end()
        } else {
            let mut seq = serializer.serialize_seq(Some(2))?;
            seq.serialize_element(&self.t_sec)?;
            seq.serialize_element(&self.lane.get())?;
            seq.end()
        }
    }
}

impl<'de> Deserialize<'de> for ChartNote {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NoteVisitor;

        impl<'de> Visitor<'de> for NoteVisitor {
            type Value = ChartNote;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a [t, lane] or [t, lane, dur] array")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<ChartNote, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let t_sec: f64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let lane_raw: u8 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let dur_sec: f64 = seq.next_element()?.unwrap_or(0.0);
                let lane = Lane::new(lane_raw)
                    .ok_or_else(|| de::Error::custom(format!("lane out of range: {lane_raw}")))?;
                Ok(ChartNote { t_sec, lane, dur_sec })
            }
        }

        deserializer.deserialize_seq(NoteVisitor)
    }
}

impl ChartNote {
    pub fn tap(t_sec: f64, lane: Lane) -> Self {
        Self { t_sec, lane, dur_sec: 0.0 }
    }

    pub fn hold(t_sec: f64, lane: Lane, dur_sec: f64) -> Self {
        Self { t_sec, lane, dur_sec }
    }

    pub fn is_hold(&self) -> bool {
        self.dur_sec > 0.0
    }

    pub fn end_t_sec(&self) -> f64 {
        self.t_sec + self.dur_sec
    }

    /// Ordering key used to keep charts sorted by `(t, lane)`.
    fn sort_key(&self) -> (OrderedFloat<f64>, u8) {
        (OrderedFloat(self.t_sec), self.lane.get())
    }
}

impl PartialOrd for ChartNote {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.sort_key().cmp(&other.sort_key()))
    }
}

/// An immutable chart document, keyed conceptually by (audio file path,
/// difficulty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub name: String,
    pub file: String,
    pub bpm: u32,
    pub duration: f64,
    pub difficulty: ChartDifficulty,
    pub notes: Vec<ChartNote>,
}

/// Difficulty tag as it appears on disk — a superset of [`Difficulty`]
/// because recorded charts are tagged `"custom"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartDifficulty {
    Easy,
    Medium,
    Hard,
    Expert,
    Custom,
}

impl From<Difficulty> for ChartDifficulty {
    fn from(d: Difficulty) -> Self {
        match d {
            Difficulty::Easy => ChartDifficulty::Easy,
            Difficulty::Medium => ChartDifficulty::Medium,
            Difficulty::Hard => ChartDifficulty::Hard,
            Difficulty::Expert => ChartDifficulty::Expert,
        }
    }
}

impl Chart {
    /// Sorts `notes` by `(t, lane)` in place. Idempotent.
    pub fn sort_notes(&mut self) {
        self.notes
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    }

    /// True iff notes are sorted by `(t, lane)` and no two entries share
    /// both fields.
    pub fn is_well_formed(&self) -> bool {
        self.notes.windows(2).all(|w| {
            let (a, b) = (&w[0], &w[1]);
            let ord = a.partial_cmp(b).unwrap_or(Ordering::Equal);
            ord == Ordering::Less
        })
    }

    /// Count of notes per lane, computed on demand (not persisted).
    pub fn lane_distribution(&self) -> [usize; Lane::COUNT] {
        let mut counts = [0usize; Lane::COUNT];
        for note in &self.notes {
            counts[note.lane.get() as usize] += 1;
        }
        counts
    }
}
