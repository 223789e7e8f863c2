mod engine_scenarios;
