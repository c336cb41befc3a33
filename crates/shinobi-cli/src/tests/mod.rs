//! Behavioural tests exercising the task runner through its public seams.

mod support;
