/// Full schema with every `\ir` include inlined, in `init.sql` order.
pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"00_extensions.sql" => out.push_str(include_str!("../../../sql/00_extensions.sql")),
				"tables/001_agent_memories.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_agent_memories.sql")),
				"tables/002_passive_memory_queue.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_passive_memory_queue.sql")),
				"tables/003_inference_calls.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_inference_calls.sql")),
				"tables/004_agent_memory_settings.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_agent_memory_settings.sql")),
				"tables/005_run_messages.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_run_messages.sql")),
				other => {
					out.push_str("-- missing include: ");
					out.push_str(other);
				},
			}

			out.push('\n');

			continue;
		}

		out.push_str(line);
		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn inlines_every_table() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "));
		assert!(!sql.contains("missing include"));

		for table in [
			"agent_memories",
			"passive_memory_queue",
			"inference_calls",
			"agent_memory_settings",
			"run_messages",
		] {
			assert!(sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")), "{table} missing");
		}
	}
}
