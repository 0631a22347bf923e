mod usage_ledger;
