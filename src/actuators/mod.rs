//! Actuators module - things the job does to the world besides reading it

pub mod camera;
