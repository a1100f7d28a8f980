use roster_engine::GeneratedSchedule;
use roster_manager_lib::application::time::format_service;

pub fn show_generated_schedule_debug_data(schedule: &GeneratedSchedule) {
    println!("\n=======================================================");
    println!("[DEBUG] generated schedule ({} services)", schedule.services.len());
    println!("=======================================================");

    for roster in &schedule.services {
        println!("[{}] ------------------------------------------", format_service(roster.service_at));

        for (role, members) in &roster.roles {
            let names = if members.is_empty() {
                "(nobody)".to_string()
            } else {
                members
                    .iter()
                    .map(|m| format!("{}#{}", m.name, m.id))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!("   {:<15} {}", role.as_str(), names);
        }

        for shortfall in &roster.shortfalls {
            println!(
                "   ! {} filled {}/{}",
                shortfall.role, shortfall.filled, shortfall.requested
            );
        }
    }
    println!("=======================================================\n");
}
