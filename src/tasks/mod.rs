pub mod startup_render;
