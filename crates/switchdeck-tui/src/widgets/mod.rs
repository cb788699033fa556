pub mod port_dialog;
pub mod port_panel;
pub mod status_indicator;
