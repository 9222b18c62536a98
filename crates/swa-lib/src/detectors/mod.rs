pub mod slow_wave;
