//! Instance query options: status filtering and optional shuffling, composed
//! as functional options the way the upstream Go client's
//! `InstanceQueryOption` does.

use rand::Rng;

use crate::application::Application;
use crate::error::EurekaError;
use crate::instance::{Instance, StatusType};

type Predicate = Box<dyn Fn(&Instance) -> bool + Send + Sync>;
/// `intn(n)` returns a value in `0..n`. Boxed so `shuffled_with` can plug in a
/// caller-supplied, seeded generator for deterministic tests.
type IntN = Box<dyn FnMut(usize) -> usize + Send>;

#[derive(Default)]
pub struct InstanceQueryOptions {
    predicate: Option<Predicate>,
    intn: Option<IntN>,
}

impl InstanceQueryOptions {
    pub fn has_predicate(&self) -> bool {
        self.predicate.is_some()
    }

    pub fn has_shuffle(&self) -> bool {
        self.intn.is_some()
    }
}

pub type QueryOption = Box<dyn FnOnce(&mut InstanceQueryOptions) -> Result<(), EurekaError>>;

fn combine_predicate(opts: &mut InstanceQueryOptions, next: Predicate) {
    opts.predicate = Some(match opts.predicate.take() {
        Some(existing) => Box::new(move |i: &Instance| existing(i) || next(i)),
        None => next,
    });
}

/// Matches instances in any of the given statuses. Calling this more than
/// once, or passing several statuses, ORs the sets together. Takes the wire
/// representation (`"UP"`, `"DOWN"`, ...) rather than `StatusType` directly so
/// an empty or unrecognized status — which can arrive from a caller building
/// this from user input — is rejected with `EurekaError::Validation` instead
/// of being a value `StatusType` structurally can't represent.
pub fn with_status(status: impl AsRef<str>) -> QueryOption {
    let status = status.as_ref().to_string();
    Box::new(move |opts| {
        let status: StatusType = status.parse().map_err(EurekaError::Validation)?;
        combine_predicate(opts, Box::new(move |i: &Instance| i.status == status));
        Ok(())
    })
}

pub fn that_are_up() -> QueryOption {
    with_status(StatusType::Up.as_wire_str())
}

/// Shuffle results using the thread-local RNG.
pub fn shuffled() -> QueryOption {
    Box::new(|opts| {
        opts.intn = Some(Box::new(|n| rand::thread_rng().gen_range(0..n)));
        Ok(())
    })
}

/// Shuffle results using a caller-supplied `intn` function, e.g. to make a
/// test deterministic.
pub fn shuffled_with(intn: impl FnMut(usize) -> usize + Send + 'static) -> QueryOption {
    Box::new(move |opts| {
        opts.intn = Some(Box::new(intn));
        Ok(())
    })
}

/// Applies `opts` (in order) and returns the matching instances across every
/// application, preserving app order and within-app instance order unless a
/// shuffle option was supplied.
pub fn filter_instances_in_apps<'a>(
    apps: &'a [Application],
    opts: Vec<QueryOption>,
) -> Result<Vec<&'a Instance>, EurekaError> {
    let mut merged = InstanceQueryOptions::default();
    for opt in opts {
        opt(&mut merged)?;
    }

    let mut out: Vec<&Instance> = apps
        .iter()
        .flat_map(|app| app.instances.iter())
        .filter(|i| match &merged.predicate {
            Some(pred) => pred(i),
            None => true,
        })
        .collect();

    if let Some(mut intn) = merged.intn {
        fisher_yates_shuffle(&mut out, &mut intn);
    }

    Ok(out)
}

fn fisher_yates_shuffle<T>(items: &mut [T], intn: &mut dyn FnMut(usize) -> usize) {
    for i in (1..items.len()).rev() {
        let j = intn(i + 1);
        items.swap(i, j);
    }
}
