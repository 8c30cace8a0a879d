pub mod detection_models;
