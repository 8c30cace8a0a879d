pub mod detections;
