/*!

This is the long-form manual for `preferential_tally` and `pvtally`.

## Counting rules

The election has a fixed list of candidates, each with a unique numeric identifier and a title.
Every ballot ranks **all** the candidates, best choice first. Ballots that are too short, too long,
that rank a candidate twice or that mention an unknown identifier stop the whole tally before any
counting is done: no ballot is silently dropped.

Each round proceeds as follows:

1. Every ballot gives one vote to its highest ranked candidate that is still running.
2. If a candidate has strictly more than half of the ballots (see [majority basis](#majority-basis)),
   this candidate is elected and the count stops.
3. Otherwise one candidate is eliminated: the one with the fewest votes. The eliminated candidate is
   removed from all the ballots, and the other choices move up.

A round can only end with an election or with exactly one elimination, so an election with `N`
candidates takes at most `N` rounds.

## Tie breaks

When several candidates share the smallest number of votes, a weighted score is computed for each
of them over all the ballots of the round. With `K` candidates still running, a candidate ranked
in position `p` (starting at 0, and only counting the candidates still running) receives `K - p`
points from that ballot. The tied candidate with the lowest score is eliminated. If the scores are
also equal, the candidate with the lowest identifier is eliminated.

Example: with the three ballots `1 > 2 > 3`, `2 > 3 > 1` and `3 > 1 > 2`, every candidate has one
vote and a score of 6. Candidate `1` is eliminated. In the next round, the first ballot goes to
candidate `2`, which wins with 2 votes out of 3.

## Majority basis

The rules decide which number of ballots a winner must hold more than half of:

- `ballotsCast` (default): all the ballots of the election. This number does not change between
  rounds.
- `continuingBallots`: only the ballots that still count for a running candidate in the round.

With complete ballots, every ballot counts for a running candidate in every round, and both rules
give the same result.

## Fixed number of candidates

Some elections always run with the same number of candidates. The `requiredCandidateCount` rule
makes the tally fail if the list of candidates has a different size.

## Input formats

`pvtally` reads ballots with the following providers:
* `json` the ballots as exported from a vote store
* `csv` Comma Separated Values, one ballot per row
* `xlsx` Excel spreadsheet, one ballot per row

### `json`

```text
{
  "candidates": [{"id": 1, "title": "Alice"}, {"id": 2, "title": "Bob"}],
  "ballots": [
    {"id": "vote-1", "rankings": [1, 2], "timestamp": "2024-03-01T10:00:00Z"},
    {"id": "vote-2", "rankings": [2, 1]}
  ]
}
```

The `candidates` entry is optional when the candidates are defined in the configuration file.
The file may also be a plain array of ballots. Additional fields are ignored.

### `csv`

```text
id,choice 1,choice 2,choice 3
vote-1,1,2,3
vote-2,Bob,Alice,Charlie
```

Each cell is either a candidate identifier or a candidate title. A number that is not the
identifier of a candidate is read as a title, so a candidate can be named `1917`. A cell that is
the identifier of one candidate and the title of another is rejected. Titles must be unique.
Empty cells at the end of a row are ignored (the ballot is then most likely too short, and will
be rejected).
The `id` column and the header row are optional.
See the [Configuration section](#configuration) on controlling the optional rows and columns.

### `xlsx`

Same layout as `csv`, read from the first worksheet or from the worksheet named with
`excelWorksheetName`. Rows and columns are counted from the top left corner of the sheet, even
when the first rows or columns are empty. Numbers must be whole numbers.

## Configuration

```text
{
  "outputSettings": {"contestName": "Best picture", "contestDate": "2024-03-10"},
  "ballotSources": [
    {"provider": "csv", "filePath": "ballots.csv",
     "firstVoteColumnIndex": 2, "firstVoteRowIndex": 2, "idColumnIndex": 1}
  ],
  "candidates": [{"id": 1, "title": "Alice"}, {"id": 2, "title": "Bob"}],
  "rules": {"majorityBasis": "ballotsCast", "requiredCandidateCount": 2}
}
```

File paths are relative to the configuration file. Row and column indexes start at 1, and may be
written as numbers, as strings, or as a single Excel column letter (`"B"`).

## Output

The summary is a JSON document with the contest information, the winner and one entry per round
with the tally and the eliminated candidate. For an eliminated candidate, `transfers` tells where
its ballots went in the next round. The audit digest printed by `pvtally` is a SHA-256
fingerprint of the rounds: two counts of the same ballots always print the same digest.

 */
