//! Stochastic document generators for test variations
//!
//! Uses seeded RNG for reproducibility. Print seed on failure for replay.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::common::EventSpec;

/// Seeded generator for reproducible stochastic tests
pub struct Gen {
    pub rng: StdRng,
    pub seed: u64,
}

/// What a value slot accepts
#[derive(Clone, Copy, PartialEq)]
enum Slot {
    Any,
    NonNull,
    /// Target of a marker: non-null, and not itself a marker or reference
    Marked,
}

/// Bookkeeping while a document is generated
#[derive(Default)]
struct Doc {
    events: Vec<EventSpec>,
    markers: Vec<String>,
    record_types: Vec<(String, usize)>,
}

impl Doc {
    fn bare(&mut self, name: &str) {
        self.events.push(EventSpec::bare(name));
    }

    fn with(&mut self, name: &str, content: impl Into<String>) {
        self.events.push(EventSpec::with(name, content));
    }
}

impl Gen {
    /// Create with specific seed (for reproduction)
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create from environment or random seed
    pub fn from_env_or_random() -> Self {
        let seed = std::env::var("CEDOC_TEST_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(rand::random);
        Self::new(seed)
    }

    /// Geometric distribution: count until rand > alpha
    /// Returns 0, 1, 2, ... with decreasing probability
    pub fn geometric(&mut self, alpha: f64) -> usize {
        let mut n = 0;
        while self.rng.gen::<f64>() < alpha {
            n += 1;
        }
        n
    }

    /// Poisson-like count (simplified)
    pub fn poisson(&mut self, lambda: f64) -> usize {
        let l = (-lambda).exp();
        let mut k = 0;
        let mut p = 1.0;
        loop {
            k += 1;
            p *= self.rng.gen::<f64>();
            if p <= l {
                break;
            }
        }
        k - 1
    }

    /// Random boolean with probability p
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p
    }

    /// Random lowercase ASCII text
    pub fn text(&mut self, max: usize) -> String {
        let len = self.rng.gen_range(0..=max);
        (0..len)
            .map(|_| self.rng.gen_range(b'a'..=b'z') as char)
            .collect()
    }

    /// A well-formed document: optional version, some record type
    /// definitions, then one top-level object.
    pub fn document(&mut self) -> Vec<EventSpec> {
        let mut doc = Doc::default();
        doc.bare("begin_document");
        if self.chance(0.3) {
            doc.with("version", "1");
        }
        for i in 0..self.geometric(0.3) {
            let name = format!("rt{}", i);
            let keys = 1 + self.geometric(0.5);
            doc.with("record_type", name.as_str());
            for k in 0..keys {
                doc.with("string", format!("k{}", k));
            }
            doc.bare("end");
            doc.record_types.push((name, keys));
        }
        self.value(&mut doc, 0);
        doc.bare("end_document");
        doc.events
    }

    fn scalar(&mut self, doc: &mut Doc) {
        match self.rng.gen_range(0..6) {
            0 => doc.with("int", self.rng.gen::<i32>().to_string()),
            1 => doc.with("bool", if self.chance(0.5) { "true" } else { "false" }),
            2 => doc.with("float", format!("{}", self.rng.gen::<f32>())),
            3 => doc.bare("time"),
            4 => doc.bare("uid"),
            _ => {
                let text = self.text(8);
                doc.with("string", text);
            }
        }
    }

    /// Value for a map key slot
    fn key(&mut self, doc: &mut Doc) {
        if !doc.markers.is_empty() && self.chance(0.1) {
            let i = self.rng.gen_range(0..doc.markers.len());
            let id = doc.markers[i].clone();
            doc.with("reference", id);
        } else if self.chance(0.1) {
            self.marker(doc);
            self.scalar(doc);
        } else if self.chance(0.2) {
            self.streamed(doc, "string", 1);
        } else {
            self.scalar(doc);
        }
    }

    fn marker(&mut self, doc: &mut Doc) {
        let id = format!("m{}", doc.markers.len());
        doc.with("marker", id.as_str());
        doc.markers.push(id);
    }

    fn value_in(&mut self, doc: &mut Doc, depth: usize, slot: Slot) {
        let choice = if depth > 4 {
            self.rng.gen_range(0..3)
        } else {
            self.rng.gen_range(0..11)
        };
        match choice {
            0 if slot == Slot::Any => doc.bare("null"),
            0 | 1 => self.scalar(doc),
            2 => self.streamed(doc, "string", 1),
            3 => self.streamed(doc, "uint16 array", 2),
            4 => {
                doc.bare("list");
                for _ in 0..self.geometric(0.6) {
                    self.value(doc, depth + 1);
                }
                doc.bare("end");
            }
            5 => {
                doc.bare("map");
                for _ in 0..self.geometric(0.6) {
                    self.key(doc);
                    self.value(doc, depth + 1);
                }
                doc.bare("end");
            }
            6 => {
                doc.bare("edge");
                self.value_in(doc, depth + 1, Slot::NonNull);
                self.value(doc, depth + 1);
                self.value_in(doc, depth + 1, Slot::NonNull);
                doc.bare("end");
            }
            7 => {
                doc.bare("node");
                self.value(doc, depth + 1);
                for _ in 0..self.geometric(0.5) {
                    self.value(doc, depth + 1);
                }
                doc.bare("end");
            }
            8 if !doc.record_types.is_empty() => {
                let i = self.rng.gen_range(0..doc.record_types.len());
                let (name, keys) = doc.record_types[i].clone();
                doc.with("record", name);
                for _ in 0..keys {
                    self.value(doc, depth + 1);
                }
                doc.bare("end");
            }
            9 if slot != Slot::Marked => {
                self.marker(doc);
                self.value_in(doc, depth, Slot::Marked);
            }
            10 if slot != Slot::Marked && !doc.markers.is_empty() => {
                let i = self.rng.gen_range(0..doc.markers.len());
                let id = doc.markers[i].clone();
                doc.with("reference", id);
            }
            _ => self.scalar(doc),
        }
    }

    fn value(&mut self, doc: &mut Doc, depth: usize) {
        self.value_in(doc, depth, Slot::Any);
    }

    /// A streamed array split into random chunks and data pieces
    fn streamed(&mut self, doc: &mut Doc, array_type: &str, element_size: usize) {
        doc.with("array_begin", array_type);
        let chunks = 1 + self.geometric(0.3);
        for c in 0..chunks {
            let elements = self.rng.gen_range(0..6);
            let more = if c + 1 < chunks { "+" } else { "" };
            doc.with("chunk", format!("{}{}", elements, more));

            let mut bytes = String::new();
            while bytes.len() < elements * element_size {
                bytes.push(self.rng.gen_range(b'a'..=b'z') as char);
            }
            while !bytes.is_empty() {
                let take = self.rng.gen_range(1..=bytes.len());
                let rest = bytes.split_off(take);
                doc.with("data", bytes);
                bytes = rest;
            }
        }
    }
}
