// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Frames in flight.
//!
//! A [`FrameRing`] rotates over N slots. Each slot goes
//! `Idle -> Recording -> Submitted` and back to `Idle` once the fence of its
//! submission has signaled. Reusing a slot blocks on that fence, which bounds
//! how far the CPU can run ahead of the GPU.
//!
//! Objects released while a frame is being recorded are parked on the slot
//! and only handed back once a later fence on that slot has signaled, so
//! nothing the GPU may still read is freed early.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use relay_core::renderer::RenderError;

/// Completion signal of one queue submission.
pub trait FrameFence {
    /// `true` once the GPU has finished the submission. Never blocks.
    fn is_signaled(&self) -> bool;

    /// Blocks until the submission has finished.
    fn wait(&mut self) -> Result<(), RenderError>;
}

/// Lifecycle of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Free to record into.
    Idle,
    /// Commands for the current frame are being recorded.
    Recording,
    /// Submitted, possibly still executing.
    Submitted,
}

#[derive(Debug)]
struct FrameSlot<F, R> {
    state: SlotState,
    fence: Option<F>,
    /// Released while recording this slot's current frame.
    pending: Vec<R>,
    /// Released during the frame guarded by `fence`.
    in_flight: Vec<R>,
}

impl<F, R> FrameSlot<F, R> {
    fn new() -> Self {
        Self {
            state: SlotState::Idle,
            fence: None,
            pending: Vec::new(),
            in_flight: Vec::new(),
        }
    }
}

/// A ring of frame-in-flight slots.
#[derive(Debug)]
pub struct FrameRing<F, R = super::resources::Retired> {
    slots: Vec<FrameSlot<F, R>>,
    current: usize,
    frame: u64,
}

impl<F: FrameFence, R> FrameRing<F, R> {
    /// Creates `count` idle slots.
    pub fn new(count: usize) -> Self {
        let count = count.max(1);
        Self {
            slots: (0..count).map(|_| FrameSlot::new()).collect(),
            current: 0,
            frame: 0,
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always `false`: a ring has at least one slot.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Index of the slot the next frame records into.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Number of frames submitted so far.
    pub fn frame_number(&self) -> u64 {
        self.frame
    }

    /// State of slot `index`.
    pub fn state(&self, index: usize) -> Option<SlotState> {
        self.slots.get(index).map(|slot| slot.state)
    }

    /// Starts recording into the current slot, waiting for its previous
    /// submission if needed. Returns the objects that are now safe to free.
    ///
    /// Calling it again while the slot is already recording is a no-op.
    pub fn begin(&mut self) -> Result<Vec<R>, RenderError> {
        let slot = &mut self.slots[self.current];
        if slot.state == SlotState::Recording {
            return Ok(Vec::new());
        }
        if let Some(fence) = slot.fence.as_mut() {
            if !fence.is_signaled() {
                log::trace!("FrameRing: waiting on slot {}", self.current);
                fence.wait()?;
            }
        }
        Ok(Self::open(slot))
    }

    /// Like [`FrameRing::begin`] but never blocks. Returns `None` while the
    /// slot's previous submission is still running.
    pub fn try_begin(&mut self) -> Option<Vec<R>> {
        let slot = &mut self.slots[self.current];
        if slot.state == SlotState::Recording {
            return Some(Vec::new());
        }
        if slot.fence.as_ref().is_some_and(|fence| !fence.is_signaled()) {
            return None;
        }
        Some(Self::open(slot))
    }

    fn open(slot: &mut FrameSlot<F, R>) -> Vec<R> {
        slot.fence = None;
        slot.state = SlotState::Recording;
        std::mem::take(&mut slot.in_flight)
    }

    /// Parks `item` on the current slot until its next submission completes.
    pub fn defer_release(&mut self, item: R) {
        self.slots[self.current].pending.push(item);
    }

    /// Marks the current slot submitted under `fence` and advances the ring.
    pub fn submit(&mut self, fence: F) -> Result<(), RenderError> {
        let slot = &mut self.slots[self.current];
        if slot.state != SlotState::Recording {
            return Err(RenderError::InvalidState(format!(
                "submitting frame slot {} that is not recording",
                self.current
            )));
        }
        slot.state = SlotState::Submitted;
        slot.fence = Some(fence);
        slot.in_flight = std::mem::take(&mut slot.pending);
        self.current = (self.current + 1) % self.slots.len();
        self.frame += 1;
        Ok(())
    }

    /// Drops the frame being recorded without submitting it. Parked releases
    /// stay on the slot for its next submission.
    pub fn abandon(&mut self) {
        let slot = &mut self.slots[self.current];
        if slot.state == SlotState::Recording {
            slot.state = SlotState::Idle;
        }
    }

    /// Waits for every slot and returns everything parked in the ring.
    pub fn drain(&mut self) -> Result<Vec<R>, RenderError> {
        let mut released = Vec::new();
        for slot in &mut self.slots {
            if let Some(mut fence) = slot.fence.take() {
                if !fence.is_signaled() {
                    fence.wait()?;
                }
            }
            slot.state = SlotState::Idle;
            released.append(&mut slot.in_flight);
            released.append(&mut slot.pending);
        }
        Ok(released)
    }
}

/// Fence over a `wgpu` queue submission.
///
/// The queue reports completion through `on_submitted_work_done`, which fires
/// once every submission made so far has finished. Callbacks only run while
/// the device is polled.
#[derive(Debug)]
pub struct SubmissionFence {
    device: wgpu::Device,
    index: wgpu::SubmissionIndex,
    done: Arc<AtomicBool>,
}

impl SubmissionFence {
    /// Tracks the submission that produced `index`. Call right after `submit`.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, index: wgpu::SubmissionIndex) -> Self {
        let done = Arc::new(AtomicBool::new(false));
        let signal = Arc::clone(&done);
        queue.on_submitted_work_done(move || signal.store(true, Ordering::Release));
        Self {
            device: device.clone(),
            index,
            done,
        }
    }

    /// The submission this fence tracks.
    pub fn submission(&self) -> &wgpu::SubmissionIndex {
        &self.index
    }
}

impl FrameFence for SubmissionFence {
    fn is_signaled(&self) -> bool {
        if self.done.load(Ordering::Acquire) {
            return true;
        }
        if let Err(e) = self.device.poll(wgpu::PollType::Poll) {
            log::warn!("SubmissionFence: non-blocking poll failed: {e:?}");
        }
        self.done.load(Ordering::Acquire)
    }

    fn wait(&mut self) -> Result<(), RenderError> {
        if self.done.load(Ordering::Acquire) {
            return Ok(());
        }
        self.device.poll(wgpu::PollType::Wait).map_err(|e| {
            log::error!("SubmissionFence: blocking poll failed: {e:?}");
            RenderError::DeviceLost
        })?;
        self.done.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// A fence the test signals by hand. `wait` records that it was called
    /// and then completes, standing in for the GPU finishing the work.
    #[derive(Debug)]
    struct MockFence {
        id: u32,
        signaled: Rc<Cell<bool>>,
        waits: Rc<RefCell<Vec<u32>>>,
    }

    impl FrameFence for MockFence {
        fn is_signaled(&self) -> bool {
            self.signaled.get()
        }

        fn wait(&mut self) -> Result<(), RenderError> {
            self.waits.borrow_mut().push(self.id);
            self.signaled.set(true);
            Ok(())
        }
    }

    struct Harness {
        waits: Rc<RefCell<Vec<u32>>>,
        signals: Vec<Rc<Cell<bool>>>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                waits: Rc::default(),
                signals: Vec::new(),
            }
        }

        fn fence(&mut self) -> MockFence {
            let signaled = Rc::new(Cell::new(false));
            self.signals.push(signaled.clone());
            MockFence {
                id: self.signals.len() as u32 - 1,
                signaled,
                waits: self.waits.clone(),
            }
        }
    }

    fn commit(ring: &mut FrameRing<MockFence, &'static str>, harness: &mut Harness) {
        ring.begin().unwrap();
        let fence = harness.fence();
        ring.submit(fence).unwrap();
    }

    #[test]
    fn slots_rotate_through_their_states() {
        let mut harness = Harness::new();
        let mut ring: FrameRing<MockFence, &'static str> = FrameRing::new(2);

        ring.begin().unwrap();
        assert_eq!(ring.state(0), Some(SlotState::Recording));
        ring.submit(harness.fence()).unwrap();

        assert_eq!(ring.state(0), Some(SlotState::Submitted));
        assert_eq!(ring.current_index(), 1);
        assert_eq!(ring.frame_number(), 1);
    }

    #[test]
    fn reusing_a_slot_waits_on_its_fence_from_n_frames_ago() {
        // --- ARRANGE ---
        let mut harness = Harness::new();
        let mut ring = FrameRing::new(2);
        commit(&mut ring, &mut harness);
        commit(&mut ring, &mut harness);
        assert!(harness.waits.borrow().is_empty());

        // --- ACT ---
        ring.begin().unwrap();

        // --- ASSERT ---
        assert_eq!(*harness.waits.borrow(), vec![0]);
        assert_eq!(ring.current_index(), 0);
    }

    #[test]
    fn signaled_fences_are_not_waited_on() {
        let mut harness = Harness::new();
        let mut ring = FrameRing::new(2);
        commit(&mut ring, &mut harness);
        commit(&mut ring, &mut harness);
        harness.signals[0].set(true);

        ring.begin().unwrap();

        assert!(harness.waits.borrow().is_empty());
    }

    #[test]
    fn recording_cannot_run_ahead_until_the_fence_signals() {
        let mut harness = Harness::new();
        let mut ring = FrameRing::new(3);
        for _ in 0..3 {
            commit(&mut ring, &mut harness);
        }

        assert!(ring.try_begin().is_none());
        assert!(ring.try_begin().is_none());
        harness.signals[0].set(true);
        assert!(ring.try_begin().is_some());
        assert_eq!(ring.state(0), Some(SlotState::Recording));
    }

    #[test]
    fn releases_wait_for_the_slot_to_come_around() {
        // --- ARRANGE ---
        let mut harness = Harness::new();
        let mut ring = FrameRing::new(2);
        ring.begin().unwrap();
        ring.defer_release("staging buffer");
        ring.submit(harness.fence()).unwrap();

        // --- ACT ---
        let on_slot_one = ring.begin().unwrap();
        ring.submit(harness.fence()).unwrap();
        let on_slot_zero = ring.begin().unwrap();

        // --- ASSERT ---
        assert!(on_slot_one.is_empty());
        assert_eq!(on_slot_zero, vec!["staging buffer"]);
    }

    #[test]
    fn abandoned_frames_keep_their_releases() {
        let mut harness = Harness::new();
        let mut ring = FrameRing::new(2);
        ring.begin().unwrap();
        ring.defer_release("old pipeline");
        ring.abandon();
        assert_eq!(ring.state(0), Some(SlotState::Idle));

        assert!(ring.begin().unwrap().is_empty());
        ring.submit(harness.fence()).unwrap();
        commit(&mut ring, &mut harness);

        assert_eq!(ring.begin().unwrap(), vec!["old pipeline"]);
    }

    #[test]
    fn submitting_an_idle_slot_is_an_error() {
        let mut harness = Harness::new();
        let mut ring: FrameRing<MockFence, ()> = FrameRing::new(2);
        assert!(matches!(
            ring.submit(harness.fence()),
            Err(RenderError::InvalidState(_))
        ));
    }

    #[test]
    fn drain_waits_for_everything() {
        let mut harness = Harness::new();
        let mut ring = FrameRing::new(2);
        ring.begin().unwrap();
        ring.defer_release("a");
        ring.submit(harness.fence()).unwrap();
        ring.begin().unwrap();
        ring.defer_release("b");

        let mut released = ring.drain().unwrap();
        released.sort();

        assert_eq!(released, vec!["a", "b"]);
        assert_eq!(*harness.waits.borrow(), vec![0]);
        assert_eq!(ring.state(0), Some(SlotState::Idle));
    }
}
