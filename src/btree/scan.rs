//! In-order range scans with proportional progress reporting.
//!
//! Each node receives a slice of the caller's progress range and divides
//! it evenly between its branches. Reported values never decrease, and
//! every node finishes by reporting exactly the end of its slice, so a scan
//! started with `(0.0, 100.0)` always ends on 100.0 whatever the tree shape.

use crate::btree::node::TreeNode;
use crate::btree::UNLIMITED_DEPTH;
use crate::device::BlockDevice;
use crate::format::DirectoryEntry;
use crate::loader::BlockLoader;

/// Callbacks invoked synchronously while a range scan walks the tree.
pub struct ScanCallbacks<'a> {
    on_entry: &'a mut dyn FnMut(u32, &DirectoryEntry),
    on_progress: &'a mut dyn FnMut(f32),
}

impl<'a> ScanCallbacks<'a> {
    /// Bundle an entry callback and a progress callback.
    pub fn new(
        on_entry: &'a mut dyn FnMut(u32, &DirectoryEntry),
        on_progress: &'a mut dyn FnMut(f32),
    ) -> Self {
        Self { on_entry, on_progress }
    }
}

/// A node's share of the overall progress range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSpan {
    start: f32,
    end: f32,
}

impl ProgressSpan {
    /// A span starting at `start` and covering `delta`.
    pub fn new(start: f32, delta: f32) -> Self {
        Self { start, end: start + delta }
    }

    /// First value of the span.
    pub fn start(&self) -> f32 {
        self.start
    }

    /// Value reported when the span's node returns.
    pub fn end(&self) -> f32 {
        self.end
    }

    /// Width of the span.
    pub fn delta(&self) -> f32 {
        self.end - self.start
    }
}

struct RangeWalk<'w, 'c, D> {
    loader: &'w BlockLoader<D>,
    min: u32,
    max: u32,
    callbacks: &'w mut ScanCallbacks<'c>,
}

impl TreeNode {
    /// Report every entry with `min <= id <= max` in ascending order.
    ///
    /// `progress` and `progress_delta` give this node's slice of the
    /// progress range; `on_progress` sees values from `progress` up to
    /// `progress + progress_delta` and always ends on the latter.
    pub fn scan_range<D: BlockDevice>(
        &self,
        loader: &BlockLoader<D>,
        min: u32,
        max: u32,
        progress: f32,
        progress_delta: f32,
        callbacks: &mut ScanCallbacks<'_>,
    ) {
        self.scan_range_within(
            loader,
            min,
            max,
            ProgressSpan::new(progress, progress_delta),
            callbacks,
            UNLIMITED_DEPTH,
        );
    }

    pub(crate) fn scan_range_within<D: BlockDevice>(
        &self,
        loader: &BlockLoader<D>,
        min: u32,
        max: u32,
        span: ProgressSpan,
        callbacks: &mut ScanCallbacks<'_>,
        max_depth: usize,
    ) {
        let mut walk = RangeWalk { loader, min, max, callbacks };
        self.walk(&mut walk, span, max_depth);
    }

    fn walk<D: BlockDevice>(
        &self,
        walk: &mut RangeWalk<'_, '_, D>,
        span: ProgressSpan,
        depth_left: usize,
    ) {
        let branch_count = self.branch_count();
        let branch_delta =
            if branch_count == 0 { 0.0 } else { span.delta() / branch_count as f32 };
        let mut progress = span.start;
        let mut stopped = false;

        for (index, entry) in self.entries().iter().enumerate() {
            let branch_span =
                ProgressSpan { start: progress, end: (progress + branch_delta).min(span.end) };

            if entry.id > walk.max {
                // The left branch can still hold ids in range; nothing to
                // the right can.
                self.walk_branch(walk, index, branch_span, depth_left);
                stopped = true;
                break;
            }

            // Below `min` the left branch holds only smaller ids, so it is
            // counted as done without being read.
            if entry.id >= walk.min {
                self.walk_branch(walk, index, branch_span, depth_left);
                (walk.callbacks.on_entry)(entry.id, entry);
            }

            if !self.is_leaf() {
                progress = branch_span.end;
                (walk.callbacks.on_progress)(progress);
            }
        }

        if !stopped && !self.is_leaf() {
            let branch_span = ProgressSpan { start: progress, end: span.end };
            self.walk_branch(walk, self.entry_count(), branch_span, depth_left);
        }

        (walk.callbacks.on_progress)(span.end);
    }

    fn walk_branch<D: BlockDevice>(
        &self,
        walk: &mut RangeWalk<'_, '_, D>,
        index: usize,
        span: ProgressSpan,
        depth_left: usize,
    ) {
        if self.is_leaf() {
            return;
        }
        if depth_left == 0 {
            log::warn!("Range scan stopped at node {:#x}: tree depth exceeded", self.address());
            return;
        }
        if let Some(child) = self.branch(walk.loader, index) {
            child.walk(walk, span, depth_left - 1);
        }
    }
}
