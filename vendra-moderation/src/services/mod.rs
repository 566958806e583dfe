pub mod report_machine;
