/// Help text shown for a bare `!!plb`.
pub fn help_text() -> String {
	[
		"§6==== PlayerBatch help ====",
		"§6!!plb §7or §6!!playerbatch §7- show this help",
		"§6Basic:",
		"§7!!plb <name> <start> <end> <action> §e- run an action on a range of bots",
		"§6Line:",
		"§7!!plb li <name> <start> <end> <direction> <spacing> <action> §e- spawn bots in a line",
		"§eDirections: §a+x, -x, +z, -z",
		"§6Grid:",
		"§7!!plb re <name> <start> <end> <direction1> <direction2> <spacing> <action> §e- spawn bots in a grid",
		"§6Lifecycle:",
		"§7!!plb init <name> <start> <length> <act_secs> <between_secs> <action> §e- spawn, act and kill bots one by one",
		"§6Control:",
		"§7!!plb stop [#batch] §e- stop all running batches, or one",
		"§7!!plb status §e- list running batches",
		"§eFollow-ups: §7spawn && <action> && <action> §e- run actions once each bot is online",
		"§eExamples:",
		"§7!!plb li bot 1 5 +x 3 spawn §e- spawn bot1 to bot5 eastwards, 3 blocks apart",
		"§7!!plb re bot 1 4 +x +z 5 spawn §e- spawn bot1 to bot4 in a 2×2 grid, 5 blocks apart",
	]
	.join("\n")
}
