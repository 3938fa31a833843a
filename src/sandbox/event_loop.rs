//! 虚拟时钟事件循环
//!
//! 每一步先清空微任务和桥接事件，再把时钟推进到最早到期的定时器。
//! 没有待执行的定时器即为空闲；超过空闲预算或步数上限时停止。

use crate::externals::ExternalLib;
use std::cell::Cell;
use std::rc::Rc;

/// 定时器触发时要做的事
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// JS 侧 setTimeout / setInterval
    Script(u32),
    /// 外部依赖到达
    Binding(ExternalLib),
}

#[derive(Debug, Clone)]
struct TimerState {
    task: TimerTask,
    due: u64,
    interval: Option<u64>,
    seq: u64,
}

/// 循环停止的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    Idle,
    BudgetExhausted,
    StepLimit,
}

#[derive(Debug)]
pub struct EventLoop {
    clock: Rc<Cell<u64>>,
    timers: Vec<TimerState>,
    seq: u64,
    steps: u32,
}

impl EventLoop {
    pub fn new() -> Self {
        Self {
            clock: Rc::new(Cell::new(0)),
            timers: Vec::new(),
            seq: 0,
            steps: 0,
        }
    }

    /// 供宿主 `Date.now()` 读取的共享时钟
    pub fn clock(&self) -> Rc<Cell<u64>> {
        self.clock.clone()
    }

    pub fn now(&self) -> u64 {
        self.clock.get()
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    pub fn set_timer(&mut self, task: TimerTask, delay: u32, repeat: bool) {
        // 重复使用同一个 id 时替换旧定时器
        self.timers.retain(|t| t.task != task);
        self.seq += 1;
        self.timers.push(TimerState {
            task,
            due: self.now() + delay as u64,
            interval: if repeat { Some((delay as u64).max(1)) } else { None },
            seq: self.seq,
        });
    }

    pub fn clear_timer(&mut self, task: TimerTask) {
        self.timers.retain(|t| t.task != task);
    }

    /// 记一步；超过上限返回 false
    pub fn step(&mut self, max_steps: u32) -> bool {
        self.steps += 1;
        self.steps <= max_steps
    }

    /// 取出下一个到期任务并推进时钟；`deadline` 之后的任务不执行
    pub fn next_due(&mut self, deadline: u64) -> Result<TimerTask, Halt> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(i, _)| i)
            .ok_or(Halt::Idle)?;

        if self.timers[index].due > deadline {
            return Err(Halt::BudgetExhausted);
        }

        let due = self.timers[index].due;
        if due > self.now() {
            self.clock.set(due);
        }

        let task = self.timers[index].task;
        match self.timers[index].interval {
            Some(interval) => {
                self.seq += 1;
                let timer = &mut self.timers[index];
                timer.due = due + interval;
                timer.seq = self.seq;
            }
            None => {
                self.timers.remove(index);
            }
        }
        Ok(task)
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}
