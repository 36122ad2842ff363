pub mod synthetic_pose;
